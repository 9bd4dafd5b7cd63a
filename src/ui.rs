use crate::client::AppSnapshot;
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use solquiz::{
    connection::ConnectionState,
    leaderboard::{
        avatar_color,
        initials,
    },
    model::{
        Address,
        RATE_QUIZ_POINT_COST,
    },
    quiz_session::QuizPhase,
    trivia::decode_html_entities,
};
use std::io::{
    Stdout,
    stdout,
};
use unicode_width::{
    UnicodeWidthChar,
    UnicodeWidthStr,
};

pub type InputEventReceiver = EventStream;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftField {
    Question,
    Option(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    ClearErrors,
    ShowLeaderboard,
    Refresh,
    Connect {
        account: Option<Address>,
        password: Option<String>,
    },
    Disconnect,
    CycleAccount,
    SwitchNetwork,
    OpenProfile,
    CloseProfile,
    SaveProfile(String),
    SelectOption(usize),
    Skip,
    ToggleBatchMode,
    Answer,
    SubmitBatch,
    Rate(bool),
    OpenDraft,
    CloseDraft,
    DraftType { field: DraftField, ch: char },
    DraftBackspace(DraftField),
    DraftAddOption,
    DraftRemoveOption(usize),
    DraftToggleCorrect(usize),
    DraftSave,
    BulkNextProvider,
    BulkNextCategory,
    BulkNextDifficulty,
    BulkIncrement,
    BulkDecrement,
    BulkImport,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Intro,
    Quiz,
    Leaderboard,
    Bulk,
}

impl Screen {
    const ALL: [Screen; 4] = [Screen::Intro, Screen::Quiz, Screen::Leaderboard, Screen::Bulk];

    fn title(self) -> &'static str {
        match self {
            Screen::Intro => "Intro",
            Screen::Quiz => "Quiz",
            Screen::Leaderboard => "Leaderboard",
            Screen::Bulk => "Bulk import",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    screen: Screen,
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
    wallet_accounts: Vec<(String, Address)>,
    requires_password: bool,
    display_name: Option<String>,
    profile_open: bool,
    draft_open: bool,
    draft_options: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    Profile {
        name: String,
    },
    Draft {
        focus: DraftField,
    },
    RateConfirm {
        positive: bool,
    },
    Unlock {
        idx: usize,
        password: String,
    },
    QuitModal,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(input: &mut InputEventReceiver) -> Result<Event> {
    match input.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    sync_state(state, snap);
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Caches what key handling needs and closes modals the controller closed.
fn sync_state(state: &mut UiState, snap: &AppSnapshot) {
    state.wallet_accounts = snap.wallet_accounts.clone();
    state.requires_password = snap.requires_password;
    state.display_name = snap.display_name.clone();
    state.profile_open = snap.profile_open;
    state.draft_open = snap.draft_open;
    state.draft_options = snap.draft.options().len();
    let closed = match state.mode {
        Mode::Profile { .. } => !snap.profile_open,
        Mode::Draft { .. } => !snap.draft_open,
        _ => false,
    };
    if closed {
        state.mode = Mode::Normal;
    }
    match &mut state.mode {
        Mode::Draft {
            focus: DraftField::Option(idx),
        } if *idx >= state.draft_options => {
            *idx = state.draft_options.saturating_sub(1);
        }
        Mode::Unlock { idx, .. } => {
            *idx = (*idx).min(state.wallet_accounts.len().saturating_sub(1));
        }
        _ => {}
    }
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => interpret_key(state, key),
        Event::Resize(..) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn interpret_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match &mut state.mode {
        Mode::Profile { name } => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::CloseProfile)
            }
            KeyCode::Enter => Some(UserEvent::SaveProfile(name.trim().to_owned())),
            KeyCode::Backspace => {
                name.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) => {
                name.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Draft { focus } => {
            let field = *focus;
            match key.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::CloseDraft)
                }
                KeyCode::Enter => Some(UserEvent::DraftSave),
                KeyCode::Tab | KeyCode::Down => {
                    *focus = next_draft_field(field, state.draft_options);
                    Some(UserEvent::Redraw)
                }
                KeyCode::BackTab | KeyCode::Up => {
                    *focus = prev_draft_field(field, state.draft_options);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char('n') if ctrl => Some(UserEvent::DraftAddOption),
                KeyCode::Char('d') if ctrl => match field {
                    DraftField::Option(idx) => Some(UserEvent::DraftRemoveOption(idx)),
                    DraftField::Question => None,
                },
                KeyCode::Char('t') if ctrl => match field {
                    DraftField::Option(idx) => Some(UserEvent::DraftToggleCorrect(idx)),
                    DraftField::Question => None,
                },
                KeyCode::Backspace => Some(UserEvent::DraftBackspace(field)),
                KeyCode::Char(ch) if !ctrl => Some(UserEvent::DraftType { field, ch }),
                _ => None,
            }
        }
        Mode::RateConfirm { positive } => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let positive = *positive;
                state.mode = Mode::Normal;
                Some(UserEvent::Rate(positive))
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Unlock { idx, password } => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Up => {
                *idx = idx.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down => {
                let max = state.wallet_accounts.len().saturating_sub(1);
                *idx = (*idx + 1).min(max);
                Some(UserEvent::Redraw)
            }
            KeyCode::Backspace => {
                password.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) => {
                password.push(c);
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let account = state.wallet_accounts.get(*idx).map(|(_, a)| *a);
                let password = std::mem::take(password);
                state.mode = Mode::Normal;
                Some(UserEvent::Connect {
                    account,
                    password: Some(password),
                })
            }
            _ => None,
        },
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => interpret_normal_key(state, key),
    }
}

fn interpret_normal_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Some(UserEvent::Quit);
        }
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            return Some(UserEvent::Redraw);
        }
        KeyCode::Tab | KeyCode::BackTab => {
            state.screen = if key.code == KeyCode::Tab {
                state.screen.next()
            } else {
                state.screen.prev()
            };
            return Some(if state.screen == Screen::Leaderboard {
                UserEvent::ShowLeaderboard
            } else {
                UserEvent::Redraw
            });
        }
        KeyCode::Char('r') => return Some(UserEvent::Refresh),
        KeyCode::Char('c') => {
            if state.requires_password {
                state.mode = Mode::Unlock {
                    idx: 0,
                    password: String::new(),
                };
                return Some(UserEvent::Redraw);
            }
            return Some(UserEvent::Connect {
                account: None,
                password: None,
            });
        }
        KeyCode::Char('D') => return Some(UserEvent::Disconnect),
        KeyCode::Char('a') => return Some(UserEvent::CycleAccount),
        KeyCode::Char('n') => return Some(UserEvent::SwitchNetwork),
        KeyCode::Char('e') => return Some(UserEvent::ClearErrors),
        KeyCode::Char('p') => {
            state.mode = Mode::Profile {
                name: state.display_name.clone().unwrap_or_default(),
            };
            return Some(UserEvent::OpenProfile);
        }
        KeyCode::Char('w') => {
            state.mode = Mode::Draft {
                focus: DraftField::Question,
            };
            return Some(UserEvent::OpenDraft);
        }
        _ => {}
    }
    match state.screen {
        Screen::Quiz => match key.code {
            KeyCode::Char(c @ '1'..='9') => {
                let option = c.to_digit(10)? as usize - 1;
                Some(UserEvent::SelectOption(option))
            }
            KeyCode::Enter => Some(UserEvent::Answer),
            KeyCode::Char('s') => Some(UserEvent::Skip),
            KeyCode::Char('b') => Some(UserEvent::ToggleBatchMode),
            KeyCode::Char('x') => Some(UserEvent::SubmitBatch),
            KeyCode::Char('+') => {
                state.mode = Mode::RateConfirm { positive: true };
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('-') => {
                state.mode = Mode::RateConfirm { positive: false };
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Screen::Bulk => match key.code {
            KeyCode::Char('v') => Some(UserEvent::BulkNextProvider),
            KeyCode::Char('g') => Some(UserEvent::BulkNextCategory),
            KeyCode::Char('d') => Some(UserEvent::BulkNextDifficulty),
            KeyCode::Char('+') | KeyCode::Right => Some(UserEvent::BulkIncrement),
            KeyCode::Char('-') | KeyCode::Left => Some(UserEvent::BulkDecrement),
            KeyCode::Enter => Some(UserEvent::BulkImport),
            _ => None,
        },
        Screen::Intro | Screen::Leaderboard => None,
    }
}

fn next_draft_field(field: DraftField, options: usize) -> DraftField {
    match field {
        DraftField::Question if options > 0 => DraftField::Option(0),
        DraftField::Option(idx) if idx + 1 < options => DraftField::Option(idx + 1),
        _ => DraftField::Question,
    }
}

fn prev_draft_field(field: DraftField, options: usize) -> DraftField {
    match field {
        DraftField::Question if options > 0 => DraftField::Option(options - 1),
        DraftField::Option(idx) if idx > 0 => DraftField::Option(idx - 1),
        _ => DraftField::Question,
    }
}

/// Cuts `text` to at most `max` terminal columns, marking the cut with `…`.
fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_owned();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w + 1 > max {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(8),
            Constraint::Length(9),
        ])
        .split(f.area());

    draw_tabs(f, chunks[0], state);
    draw_account_panel(f, chunks[1], snap);
    match state.screen {
        Screen::Intro => draw_intro(f, chunks[2], snap),
        Screen::Quiz => draw_quiz(f, chunks[2], snap),
        Screen::Leaderboard => draw_leaderboard(f, chunks[2], snap),
        Screen::Bulk => draw_bulk(f, chunks[2], snap),
    }
    draw_bottom(f, chunks[3], state, snap);
    draw_modals(f, state, snap);
}

fn draw_tabs(f: &mut Frame, area: Rect, state: &UiState) {
    let tabs = Tabs::new(Screen::ALL.iter().map(|s| s.title()))
        .select(state.screen.index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title("SolQuiz"));
    f.render_widget(tabs, area);
}

fn draw_account_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let connection = match &snap.connection {
        ConnectionState::NotReady(reason) => {
            Line::from(reason.message()).style(Style::default().fg(Color::Yellow))
        }
        ConnectionState::Ready { account, .. } => {
            let name = snap.display_name.as_deref().unwrap_or("no profile yet");
            let points = snap
                .points
                .map(|p| p.to_string())
                .unwrap_or_else(|| String::from("-"));
            Line::from(format!(
                "Account: {} | {} | Points: {}",
                account.truncated(),
                name,
                points
            ))
        }
    };
    let network = Line::from(format!("Network: {}", snap.network));
    let widget = Paragraph::new(vec![network, connection])
        .block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn draw_intro(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines = vec![
        Line::from("Welcome to SolQuiz.").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("Answer quizzes written by other players to earn points."),
        Line::from(format!(
            "Rating a quiz costs {RATE_QUIZ_POINT_COST} points and rewards its creator."
        )),
        Line::from("Create your own quizzes, or import a set from a trivia provider."),
        Line::from(""),
        Line::from("Press c to connect a wallet and p to create your profile."),
        Line::from("Press n to switch between the sandbox and Sepolia networks."),
        Line::from("The sandbox network is deployed and seeded on every launch."),
    ];
    if let Some(reason) = snap.connection.not_ready_reason() {
        lines.push(Line::from(""));
        lines.push(Line::from(reason.message()).style(Style::default().fg(Color::Yellow)));
    }
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Intro"));
    f.render_widget(widget, area);
}

fn draw_quiz(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let block = Block::default().borders(Borders::ALL).title("Quiz");
    let quiz = &snap.quiz;
    let width = block.inner(area).width as usize;
    let mut lines: Vec<Line> = Vec::new();
    if let Some(reason) = snap.connection.not_ready_reason() {
        lines.push(Line::from(reason.message()));
    } else {
        match (quiz.phase, quiz.candidate.as_ref()) {
            (QuizPhase::NoPool | QuizPhase::Loading, _) => {
                lines.push(Line::from("Loading quizzes..."));
            }
            (QuizPhase::NoCandidate, _) | (QuizPhase::HasCandidate, None) => {
                lines.push(Line::from("No quizzes left to answer."));
                lines.push(Line::from(
                    "Write one with w or import a set on the Bulk import tab.",
                ));
            }
            (QuizPhase::HasCandidate, Some(candidate)) => {
                lines.push(
                    Line::from(decode_html_entities(&candidate.question))
                        .style(Style::default().add_modifier(Modifier::BOLD)),
                );
                lines.push(Line::from(format!(
                    "by {} | {} answers | +{} / -{} ratings",
                    quiz.creator,
                    candidate.number_of_responses,
                    candidate.positive_ratings,
                    candidate.negative_ratings()
                )));
                lines.push(Line::from(""));
                for (idx, option) in candidate.options.iter().enumerate() {
                    let selected = quiz.selected_option == Some(idx);
                    let marker = if selected { "(•)" } else { "( )" };
                    let text = format!("{marker} {}. {}", idx + 1, decode_html_entities(option));
                    let style = if selected {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    };
                    lines.push(Line::from(truncate_to_width(&text, width)).style(style));
                }
                lines.push(Line::from(""));
                if let Some(blocker) = quiz.answer_blocker {
                    lines.push(Line::from(blocker).style(Style::default().fg(Color::Yellow)));
                }
                if let Some(blocker) = quiz.rate_blocker {
                    lines.push(
                        Line::from(format!("Rating: {blocker}"))
                            .style(Style::default().fg(Color::DarkGray)),
                    );
                }
            }
        }
        let mut footer = format!(
            "Batch mode: {} | Queued: {} | Pool: {}",
            if quiz.batch_mode { "on" } else { "off" },
            quiz.batch_len,
            quiz.pool_len
        );
        if quiz.sending_answer {
            footer.push_str(" | Sending answer...");
        }
        if quiz.rating {
            footer.push_str(" | Rating...");
        }
        if !quiz.can_skip {
            footer.push_str(" | Nothing to skip to");
        }
        lines.push(Line::from(footer).style(Style::default().fg(Color::DarkGray)));
    }
    let widget = Paragraph::new(lines).wrap(Wrap { trim: false }).block(block);
    f.render_widget(widget, area);
}

fn draw_leaderboard(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let title = if snap.leaderboard_loading {
        "Leaderboard (loading...)"
    } else {
        "Leaderboard"
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    if snap.leaderboard.is_empty() {
        let text = if snap.connection.is_ready() {
            "No players yet."
        } else {
            "Connect to see the leaderboard."
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }
    let me = snap.connection.account();
    let rows = snap.leaderboard.iter().enumerate().map(|(idx, entry)| {
        let (r, g, b) = avatar_color(&entry.display_name);
        let avatar = Cell::from(format!(" {:<2}", initials(&entry.display_name)))
            .style(Style::default().bg(Color::Rgb(r, g, b)).fg(Color::White));
        let mut name = entry.display_name.clone();
        if me == Some(entry.address) {
            name.push_str(" (You)");
        }
        Row::new(vec![
            Cell::from(format!("{}", idx + 1)),
            avatar,
            Cell::from(name),
            Cell::from(entry.address.truncated()),
            Cell::from(entry.points.to_string()),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Min(16),
            Constraint::Length(14),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["#", "", "Name", "Address", "Points"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);
    f.render_widget(table, area);
}

fn draw_bulk(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let bulk = &snap.bulk;
    let mut lines = vec![
        Line::from(format!(
            "Provider (v): {}{}",
            bulk.provider,
            if bulk.enabled { "" } else { " (unavailable)" }
        )),
        Line::from(format!(
            "Category (g): {}",
            bulk.category.unwrap_or("choose a category")
        )),
        Line::from(format!(
            "Difficulty (d): {}",
            bulk.difficulty.unwrap_or("choose a difficulty")
        )),
        Line::from(format!("Questions (+/-): {}", bulk.count)),
        Line::from(""),
    ];
    if bulk.importing {
        lines.push(Line::from("Importing...").style(Style::default().fg(Color::Cyan)));
    } else if !snap.can_author {
        lines.push(
            Line::from("Connect an account with a profile to import quizzes.")
                .style(Style::default().fg(Color::Yellow)),
        );
    } else {
        lines.push(Line::from("Press Enter to import."));
    }
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Bulk import"));
    f.render_widget(widget, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let status_widget = if snap.errors.is_empty() {
        let mut lines: Vec<Line> = Vec::new();
        if snap.status.trim().is_empty() {
            lines.push(Line::from("Ready"));
        } else {
            for line in snap.status.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines: Vec<Line> = snap.errors.iter().map(|e| Line::from(e.clone())).collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors (e to clear)"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(status_widget, chunks[0]);

    let screen_help = match state.screen {
        Screen::Quiz => "1-9 pick | Enter answer | s skip | b batch | x submit batch | +/- rate",
        Screen::Bulk => "v provider | g category | d difficulty | +/- count | Enter import",
        Screen::Intro | Screen::Leaderboard => "",
    };
    let help = Paragraph::new(format!(
        "Tab screens | c connect | D disconnect | a account | n network | p profile | w new quiz | r refresh | q quit | {screen_help}"
    ))
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[1]);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::Profile { name } => {
            let area = centered_rect(50, 25, f.area());
            let title = if snap.display_name.is_some() {
                "Edit profile"
            } else {
                "Create profile"
            };
            let block = Block::default().borders(Borders::ALL).title(title);
            let mut lines = vec![
                Line::from(format!("Display name: {name}_")),
                Line::from(""),
                Line::from("Enter=save, Esc=cancel"),
            ];
            if snap.profile_saving {
                lines.push(Line::from("Saving...").style(Style::default().fg(Color::Cyan)));
            }
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
        Mode::Draft { focus } => {
            let area = centered_rect(70, 60, f.area());
            let block = Block::default().borders(Borders::ALL).title("New quiz");
            let focused = Style::default().fg(Color::Yellow);
            let draft = &snap.draft;
            let question_style = if *focus == DraftField::Question {
                focused
            } else {
                Style::default()
            };
            let mut lines =
                vec![Line::from(format!("Question: {}", draft.question())).style(question_style)];
            for (idx, option) in draft.options().iter().enumerate() {
                let mark = if draft.correct_option() == Some(idx) {
                    "[x]"
                } else {
                    "[ ]"
                };
                let style = if *focus == DraftField::Option(idx) {
                    focused
                } else {
                    Style::default()
                };
                lines.push(Line::from(format!("{mark} Option {}: {option}", idx + 1)).style(style));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(
                "Tab next field | Ctrl-n add option | Ctrl-d remove option | Ctrl-t mark correct",
            ));
            lines.push(Line::from("Enter=save, Esc=cancel"));
            if snap.draft_saving {
                lines.push(Line::from("Saving...").style(Style::default().fg(Color::Cyan)));
            } else if !snap.can_author {
                lines.push(
                    Line::from("Create a profile before writing quizzes.")
                        .style(Style::default().fg(Color::Yellow)),
                );
            }
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(
                Paragraph::new(lines).wrap(Wrap { trim: false }),
                block.inner(area),
            );
        }
        Mode::RateConfirm { positive } => {
            let area = centered_rect(50, 20, f.area());
            let title = if *positive { "Rate up" } else { "Rate down" };
            let block = Block::default().borders(Borders::ALL).title(title);
            let p = Paragraph::new(format!(
                "This action costs {RATE_QUIZ_POINT_COST} points. Are you sure you want to proceed? (Y/N)"
            ))
            .wrap(Wrap { trim: false });
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Unlock { idx, password } => {
            let area = centered_rect(60, 40, f.area());
            let block = Block::default().borders(Borders::ALL).title("Unlock wallet");
            let mut lines: Vec<Line> = Vec::new();
            if state.wallet_accounts.is_empty() {
                lines.push(Line::from("No wallets in the keystore."));
            }
            for (i, (name, address)) in state.wallet_accounts.iter().enumerate() {
                let text = format!("{name} ({})", address.truncated());
                if i == *idx {
                    lines.push(Line::from(format!("> {text}")).style(Style::default().fg(Color::Yellow)));
                } else {
                    lines.push(Line::from(format!("  {text}")));
                }
            }
            lines.push(Line::from(""));
            lines.push(Line::from(format!(
                "Password: {}",
                "*".repeat(password.chars().count())
            )));
            lines.push(Line::from("↑/↓ select, Enter=unlock, Esc=cancel"));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit SolQuiz? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    #[test]
    fn interpret_event__quit_needs_confirmation() {
        let mut state = UiState::default();

        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('q'))),
            Some(UserEvent::Redraw)
        );
        assert_eq!(state.mode, Mode::QuitModal);
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('n'))),
            Some(UserEvent::Redraw)
        );
        assert_eq!(state.mode, Mode::Normal);

        interpret_event(&mut state, key(KeyCode::Esc));
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('y'))),
            Some(UserEvent::Quit)
        );
    }

    #[test]
    fn interpret_event__release_events_are_ignored() {
        let mut state = UiState::default();
        let mut release = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;

        assert_eq!(interpret_event(&mut state, Event::Key(release)), None);
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__digits_select_options_only_on_quiz_screen() {
        // given
        let mut state = UiState::default();
        assert_eq!(interpret_event(&mut state, key(KeyCode::Char('2'))), None);

        // when
        interpret_event(&mut state, key(KeyCode::Tab));

        // then
        assert_eq!(state.screen, Screen::Quiz);
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('2'))),
            Some(UserEvent::SelectOption(1))
        );
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Enter)),
            Some(UserEvent::Answer)
        );
    }

    #[test]
    fn interpret_event__tab_to_leaderboard_requests_fetch() {
        let mut state = UiState {
            screen: Screen::Quiz,
            ..UiState::default()
        };

        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Tab)),
            Some(UserEvent::ShowLeaderboard)
        );
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::BackTab)),
            Some(UserEvent::Redraw)
        );
        assert_eq!(state.screen, Screen::Quiz);
    }

    #[test]
    fn interpret_event__rating_asks_for_confirmation() {
        let mut state = UiState {
            screen: Screen::Quiz,
            ..UiState::default()
        };

        interpret_event(&mut state, key(KeyCode::Char('-')));
        assert_eq!(state.mode, Mode::RateConfirm { positive: false });

        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('y'))),
            Some(UserEvent::Rate(false))
        );
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__profile_modal_collects_name() {
        // given
        let mut state = UiState {
            display_name: Some("Al".into()),
            ..UiState::default()
        };
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('p'))),
            Some(UserEvent::OpenProfile)
        );

        // when
        interpret_event(&mut state, key(KeyCode::Char('i')));
        interpret_event(&mut state, key(KeyCode::Char('x')));
        interpret_event(&mut state, key(KeyCode::Backspace));
        let save = interpret_event(&mut state, key(KeyCode::Enter));

        // then
        assert_eq!(save, Some(UserEvent::SaveProfile("Ali".into())));
        assert!(matches!(state.mode, Mode::Profile { .. }));
    }

    #[test]
    fn interpret_event__draft_keys_target_focused_field() {
        // given
        let mut state = UiState {
            draft_options: 2,
            ..UiState::default()
        };
        interpret_event(&mut state, key(KeyCode::Char('w')));

        // when
        let typed = interpret_event(&mut state, key(KeyCode::Char('q')));
        interpret_event(&mut state, key(KeyCode::Tab));
        interpret_event(&mut state, key(KeyCode::Tab));
        let toggled = interpret_event(&mut state, ctrl('t'));
        let removed = interpret_event(&mut state, ctrl('d'));
        interpret_event(&mut state, key(KeyCode::Tab));

        // then
        assert_eq!(
            typed,
            Some(UserEvent::DraftType {
                field: DraftField::Question,
                ch: 'q'
            })
        );
        assert_eq!(toggled, Some(UserEvent::DraftToggleCorrect(1)));
        assert_eq!(removed, Some(UserEvent::DraftRemoveOption(1)));
        assert_eq!(
            state.mode,
            Mode::Draft {
                focus: DraftField::Question
            }
        );
    }

    #[test]
    fn interpret_event__unlock_modal_masks_and_sends_password() {
        // given
        let bob = Address::new([0x02; 20]);
        let mut state = UiState {
            requires_password: true,
            wallet_accounts: vec![
                ("alice".into(), Address::new([0x01; 20])),
                ("bob".into(), bob),
            ],
            ..UiState::default()
        };

        // when
        interpret_event(&mut state, key(KeyCode::Char('c')));
        interpret_event(&mut state, key(KeyCode::Down));
        interpret_event(&mut state, key(KeyCode::Down));
        for c in "pw".chars() {
            interpret_event(&mut state, key(KeyCode::Char(c)));
        }
        let connect = interpret_event(&mut state, key(KeyCode::Enter));

        // then
        assert_eq!(
            connect,
            Some(UserEvent::Connect {
                account: Some(bob),
                password: Some("pw".into()),
            })
        );
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__dev_wallet_connects_without_modal() {
        let mut state = UiState::default();

        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('c'))),
            Some(UserEvent::Connect {
                account: None,
                password: None,
            })
        );
    }

    #[test]
    fn truncate_to_width__respects_wide_characters() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefgh", 5), "abcd…");
        // each CJK character is two columns wide
        assert_eq!(truncate_to_width("日本語テキスト", 6), "日本…");
    }
}
