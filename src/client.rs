use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use solquiz::{
    connection::{
        ConnectionState,
        ConnectionTracker,
    },
    deployment::{
        ArtifactStore,
        Network,
        QuizArtifact,
        SANDBOX_CHAIN_ID,
    },
    draft::{
        DraftEditor,
        NewQuizDraft,
    },
    gateway::{
        AccountRequest,
        LeaderboardColumns,
        QuizContract,
        Session,
        WalletEvent,
        WalletProvider,
        WalletSubscription,
    },
    leaderboard::Leaderboard,
    model::{
        Address,
        LeaderboardEntry,
        Quiz,
        Receipt,
        User,
    },
    profile::{
        ProfileSession,
        ProfileWrite,
    },
    quiz_session::{
        AnswerCall,
        QuizPhase,
        QuizSession,
        RateCall,
        creator_label,
    },
    sandbox::{
        self,
        SandboxContract,
        SandboxDirectory,
    },
    trivia::{
        self,
        BulkForm,
        TriviaClient,
    },
    wallets::LocalWallet,
};
use std::{
    future::Future,
    path::PathBuf,
};
use tokio::sync::mpsc;
use tracing::{
    error,
    info,
    warn,
};

const MAX_ERRORS: usize = 50;
const VISIBLE_ERRORS: usize = 5;

#[derive(Clone, Debug)]
pub enum WalletConfig {
    Disabled,
    Keystore {
        dir: PathBuf,
        unlock: Option<String>,
    },
    Development {
        count: usize,
    },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: Network,
    pub artifact_path: PathBuf,
    pub wallet: WalletConfig,
    pub seed_quizzes: usize,
    pub trivia_url: String,
}

/// Result of a contract or provider call, delivered back to the event loop.
#[derive(Debug)]
pub enum CallOutcome {
    ProfileLoaded {
        account: Address,
        result: Result<User>,
    },
    ProfileSaved {
        write: ProfileWrite,
        result: Result<Receipt>,
    },
    QuizzesFetched(Result<Vec<Quiz>>),
    Answered {
        call: AnswerCall,
        result: Result<Receipt>,
    },
    Rated {
        call: RateCall,
        result: Result<Receipt>,
    },
    QuizCreated(Result<Receipt>),
    LeaderboardFetched(Result<LeaderboardColumns>),
    Imported(Result<usize>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Clone, Debug, Default)]
pub struct QuizView {
    pub phase: QuizPhase,
    pub candidate: Option<Quiz>,
    pub creator: String,
    pub selected_option: Option<usize>,
    pub batch_mode: bool,
    pub batch_len: usize,
    pub pool_len: usize,
    pub can_skip: bool,
    pub answer_blocker: Option<&'static str>,
    pub rate_blocker: Option<&'static str>,
    pub sending_answer: bool,
    pub rating: bool,
}

#[derive(Clone, Debug, Default)]
pub struct BulkView {
    pub provider: &'static str,
    pub enabled: bool,
    pub category: Option<&'static str>,
    pub difficulty: Option<&'static str>,
    pub count: u32,
    pub importing: bool,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub connection: ConnectionState,
    pub network: String,
    pub wallet_accounts: Vec<(String, Address)>,
    pub requires_password: bool,
    pub display_name: Option<String>,
    pub points: Option<i64>,
    pub profile_loading: bool,
    pub profile_saving: bool,
    pub profile_open: bool,
    pub quiz: QuizView,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub leaderboard_loading: bool,
    pub draft: NewQuizDraft,
    pub draft_open: bool,
    pub draft_saving: bool,
    pub can_author: bool,
    pub bulk: BulkView,
    pub status: String,
    pub errors: Vec<String>,
}

type Tracker = ConnectionTracker<LocalWallet, SandboxDirectory>;

pub struct AppController {
    tracker: Tracker,
    profile: ProfileSession,
    quiz: QuizSession,
    draft: DraftEditor,
    leaderboard: Leaderboard,
    bulk: BulkForm,
    trivia: TriviaClient,
    connected: Option<(Address, u64)>,
    status: String,
    errors: Vec<String>,
    outcomes: mpsc::UnboundedSender<CallOutcome>,
}

/// Deploys a fresh sandbox contract, records it in the artifact and seeds it.
async fn bootstrap(
    config: &AppConfig,
    rng: &mut StdRng,
) -> Result<(Option<LocalWallet>, SandboxDirectory, Option<QuizArtifact>)> {
    let chain_id = config.network.chain_id();
    let wallet = match &config.wallet {
        WalletConfig::Disabled => None,
        WalletConfig::Keystore { dir, unlock } => {
            let wallet = LocalWallet::detect_keystore(dir, chain_id)?;
            if let (Some(wallet), Some(name)) = (wallet.as_ref(), unlock.as_deref()) {
                let address = wallet
                    .unlock_interactive(name)
                    .wrap_err_with(|| format!("Unlocking wallet '{name}' failed"))?;
                info!(%address, "wallet unlocked");
            }
            wallet
        }
        WalletConfig::Development { count } => {
            Some(LocalWallet::development(*count, chain_id, rng))
        }
    };
    let accounts: Vec<Address> = wallet
        .as_ref()
        .map(|w| w.accounts().into_iter().map(|(_, a)| a).collect())
        .unwrap_or_default();
    // the last development account deploys, so it is the manager
    let deployer = match (&config.wallet, accounts.last()) {
        (WalletConfig::Development { .. }, Some(last)) if accounts.len() > 1 => *last,
        _ => Address::new(rng.random::<[u8; 20]>()),
    };

    let directory = SandboxDirectory::default();
    let contract = directory.deploy(SANDBOX_CHAIN_ID, deployer, rng)?;
    sandbox::seed(&contract, &accounts, config.seed_quizzes, rng)
        .await
        .wrap_err("seeding sandbox failed")?;
    info!(address = %contract.address(), manager = %deployer, "sandbox contract deployed");

    let store = ArtifactStore::new(&config.artifact_path);
    let artifact = match store.record_deployment(SANDBOX_CHAIN_ID, contract.address()) {
        Ok(artifact) => Some(artifact),
        Err(err) => {
            warn!(?err, path = %store.path().display(), "recording sandbox deployment failed");
            None
        }
    };
    Ok((wallet, directory, artifact))
}

impl AppController {
    pub async fn new(
        config: AppConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CallOutcome>)> {
        let mut rng = StdRng::from_os_rng();
        let (wallet, directory, artifact) = bootstrap(&config, &mut rng).await?;
        let trivia = TriviaClient::new(config.trivia_url.clone())?;
        let tracker = ConnectionTracker::new(wallet, directory, artifact);
        Ok(Self::from_parts(tracker, trivia))
    }

    pub fn from_parts(
        tracker: Tracker,
        trivia: TriviaClient,
    ) -> (Self, mpsc::UnboundedReceiver<CallOutcome>) {
        let (outcomes, outcome_rx) = mpsc::unbounded_channel();
        let controller = Self {
            tracker,
            profile: ProfileSession::default(),
            quiz: QuizSession::default(),
            draft: DraftEditor::default(),
            leaderboard: Leaderboard::default(),
            bulk: BulkForm::default(),
            trivia,
            connected: None,
            status: String::from("Ready"),
            errors: Vec::new(),
            outcomes,
        };
        (controller, outcome_rx)
    }

    pub fn subscribe(&self) -> Option<WalletSubscription> {
        self.tracker.subscribe()
    }

    fn session(&self) -> Option<Session<SandboxContract>> {
        self.tracker.session()
    }

    fn can_author(&self) -> bool {
        self.session().is_some() && self.profile.has_profile()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        info!(status = %self.status, "status");
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    fn spawn_call<F>(&self, call: F)
    where
        F: Future<Output = CallOutcome> + Send + 'static,
    {
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let outcome = call.await;
            if outcomes.send(outcome).is_err() {
                warn!("event loop gone, dropping call outcome");
            }
        });
    }

    pub async fn initialize(&mut self) {
        if let Err(err) = self.tracker.initialize().await {
            self.push_errors(vec![format!("Connecting to the network failed: {err}")]);
        }
        self.on_connection_change();
    }

    /// Resets or reloads the session-bound components when the ready account
    /// or network changes.
    fn on_connection_change(&mut self) {
        let current = self
            .session()
            .map(|session| (session.account, session.chain_id));
        if current == self.connected {
            return;
        }
        self.connected = current;
        self.profile.reset();
        self.quiz.reset();
        self.leaderboard.reset();
        self.draft.close();
        match self.session() {
            Some(session) => {
                info!(account = %session.account, chain_id = session.chain_id, "session ready");
                self.load_profile(&session);
                self.fetch_quizzes(&session);
                self.fetch_leaderboard(&session);
            }
            None => {
                if let Some(reason) = self.tracker.state().not_ready_reason() {
                    info!(?reason, "session not ready");
                }
            }
        }
    }

    fn load_profile(&mut self, session: &Session<SandboxContract>) {
        self.profile.begin_load(session.account);
        let contract = session.contract.clone();
        let account = session.account;
        self.spawn_call(async move {
            let result = contract.leaderboard(account).await;
            CallOutcome::ProfileLoaded { account, result }
        });
    }

    fn fetch_quizzes(&mut self, session: &Session<SandboxContract>) {
        self.quiz.begin_fetch();
        self.spawn_quiz_fetch(session);
    }

    fn spawn_quiz_fetch(&self, session: &Session<SandboxContract>) {
        let contract = session.contract.clone();
        let account = session.account;
        self.spawn_call(async move {
            CallOutcome::QuizzesFetched(contract.get_quizzes(true, account).await)
        });
    }

    fn fetch_leaderboard(&mut self, session: &Session<SandboxContract>) {
        self.leaderboard.begin_fetch();
        let contract = session.contract.clone();
        self.spawn_call(async move {
            CallOutcome::LeaderboardFetched(contract.get_leaderboard().await)
        });
    }

    pub async fn handle_wallet_event(&mut self, event: WalletEvent) {
        if let Err(err) = self.tracker.handle_wallet_event(event).await {
            self.push_errors(vec![format!("Wallet update failed: {err}")]);
        }
        self.on_connection_change();
    }

    pub async fn handle_event(&mut self, event: ui::UserEvent) -> Result<Flow> {
        use ui::UserEvent;
        match event {
            UserEvent::Quit => return Ok(Flow::Quit),
            UserEvent::Redraw => {}
            UserEvent::ClearErrors => self.errors.clear(),
            UserEvent::ShowLeaderboard => {
                if let Some(session) = self.session() {
                    self.fetch_leaderboard(&session);
                }
            }
            UserEvent::Refresh => self.refresh().await,
            UserEvent::Connect { account, password } => {
                self.connect(AccountRequest { account, password }).await;
            }
            UserEvent::Disconnect => {
                self.tracker.disconnect();
                self.set_status("Disconnected");
                self.on_connection_change();
            }
            UserEvent::CycleAccount => self.cycle_account(),
            UserEvent::SwitchNetwork => self.switch_network(),
            UserEvent::OpenProfile => self.profile.open_editor(),
            UserEvent::CloseProfile => self.profile.close_editor(),
            UserEvent::SaveProfile(name) => self.save_profile(&name),
            UserEvent::SelectOption(option) => {
                self.quiz.select_option(option);
            }
            UserEvent::Skip => {
                if !self.quiz.skip() {
                    self.set_status("Skipping needs at least two quizzes");
                }
            }
            UserEvent::ToggleBatchMode => {
                let batch_mode = !self.quiz.batch_mode();
                self.quiz.set_batch_mode(batch_mode);
                self.set_status(if batch_mode {
                    "Batch mode on"
                } else {
                    "Batch mode off"
                });
            }
            UserEvent::Answer => self.answer(),
            UserEvent::SubmitBatch => self.submit_batch(),
            UserEvent::Rate(positive) => self.rate(positive),
            UserEvent::OpenDraft => self.draft.open(),
            UserEvent::CloseDraft => self.draft.close(),
            UserEvent::DraftType { field, ch } => {
                if let Some(text) = draft_field(self.draft.draft_mut(), field) {
                    text.push(ch);
                }
            }
            UserEvent::DraftBackspace(field) => {
                if let Some(text) = draft_field(self.draft.draft_mut(), field) {
                    text.pop();
                }
            }
            UserEvent::DraftAddOption => self.draft.draft_mut().add_option(),
            UserEvent::DraftRemoveOption(idx) => {
                if !self.draft.draft_mut().remove_option(idx) {
                    self.set_status("That option cannot be removed");
                }
            }
            UserEvent::DraftToggleCorrect(idx) => self.draft.draft_mut().toggle_correct(idx),
            UserEvent::DraftSave => self.save_draft(),
            UserEvent::BulkNextProvider => self.bulk.next_provider(),
            UserEvent::BulkNextCategory => self.bulk.next_category(),
            UserEvent::BulkNextDifficulty => self.bulk.next_difficulty(),
            UserEvent::BulkIncrement => self.bulk.increment(),
            UserEvent::BulkDecrement => self.bulk.decrement(),
            UserEvent::BulkImport => self.import(),
        }
        Ok(Flow::Continue)
    }

    async fn refresh(&mut self) {
        match self.session() {
            Some(session) => {
                self.load_profile(&session);
                self.fetch_quizzes(&session);
                self.fetch_leaderboard(&session);
                self.set_status("Refreshing...");
            }
            None => self.initialize().await,
        }
    }

    async fn connect(&mut self, request: AccountRequest) {
        match self.tracker.connect(request).await {
            Ok(Some(account)) => self.set_status(format!("Connected {}", account.truncated())),
            Ok(None) => self.set_status("No account approved"),
            Err(err) => self.push_errors(vec![format!("Connecting wallet failed: {err:#}")]),
        }
        self.on_connection_change();
    }

    fn cycle_account(&mut self) {
        let Some(wallet) = self.tracker.wallet() else {
            self.push_errors(vec![String::from("No wallet found")]);
            return;
        };
        match wallet.cycle_account() {
            Ok(Some(account)) => self.set_status(format!("Switched to {}", account.truncated())),
            Ok(None) => self.set_status("Wallet has no accounts"),
            Err(err) => self.push_errors(vec![err.to_string()]),
        }
    }

    fn switch_network(&mut self) {
        let Some(wallet) = self.tracker.wallet() else {
            self.push_errors(vec![String::from("No wallet found")]);
            return;
        };
        let current = wallet.current_chain_id();
        let target = Network::from_chain_id(current)
            .map(Network::other)
            .unwrap_or(Network::Sandbox);
        match wallet.switch_chain(target.chain_id()) {
            Ok(()) => self.set_status(format!("Switching to {target}...")),
            Err(err) => self.push_errors(vec![format!("Switching network failed: {err}")]),
        }
    }

    fn save_profile(&mut self, name: &str) {
        let session = self.session();
        let Some(write) = self.profile.begin_save(session.is_some(), name) else {
            if name.is_empty() {
                self.set_status("Display name cannot be empty");
            }
            return;
        };
        let Some(session) = session else {
            return;
        };
        self.set_status(format!("Saving profile '{}'...", write.display_name()));
        self.spawn_call(async move {
            let result = write
                .clone()
                .send(&session.contract, session.account)
                .await;
            CallOutcome::ProfileSaved { write, result }
        });
    }

    fn answer(&mut self) {
        let Some(session) = self.session() else {
            return;
        };
        if let Some(blocker) = self.quiz.answer_blocker(session.account, session.manager) {
            self.set_status(blocker.message());
            return;
        }
        if self.quiz.batch_mode() {
            if self.quiz.add_to_batch(session.account, session.manager) {
                self.set_status(format!("{} answer(s) queued", self.quiz.batch().len()));
            } else {
                self.set_status("Pick an option first");
            }
            return;
        }
        let Some(call) = self.quiz.begin_answer(session.account, session.manager) else {
            self.set_status("Pick an option first");
            return;
        };
        self.set_status("Submitting answer...");
        self.send_answer(call, session);
    }

    fn submit_batch(&mut self) {
        let Some(session) = self.session() else {
            return;
        };
        let Some(call) = self.quiz.begin_batch_submit() else {
            self.set_status("No answers queued");
            return;
        };
        self.set_status(format!("Submitting {} answers...", self.quiz.batch().len()));
        self.send_answer(call, session);
    }

    fn send_answer(&self, call: AnswerCall, session: Session<SandboxContract>) {
        self.spawn_call(async move {
            let result = call
                .clone()
                .send(&session.contract, session.account)
                .await;
            CallOutcome::Answered { call, result }
        });
    }

    fn rate(&mut self, positive: bool) {
        let Some(session) = self.session() else {
            return;
        };
        let points = self.profile.points();
        if let Some(blocker) = self.quiz.rate_blocker(session.account, points) {
            self.set_status(blocker.message());
            return;
        }
        let Some(call) = self.quiz.begin_rate(positive, session.account, points) else {
            return;
        };
        self.set_status("Submitting rating...");
        self.spawn_call(async move {
            let result = call.send(&session.contract, session.account).await;
            CallOutcome::Rated { call, result }
        });
    }

    fn save_draft(&mut self) {
        let can_author = self.can_author();
        let session = self.session();
        let Some(call) = self.draft.begin_save(can_author) else {
            if !can_author {
                self.set_status("Connect an account with a profile to create quizzes");
            } else if !self.draft.draft().is_complete() {
                self.set_status("Fill in the question, every option and the correct answer");
            }
            return;
        };
        let Some(session) = session else {
            return;
        };
        self.set_status("Creating quiz...");
        self.spawn_call(async move {
            CallOutcome::QuizCreated(call.send(&session.contract, session.account).await)
        });
    }

    fn import(&mut self) {
        let Some(session) = self.session() else {
            self.set_status("Connect an account first");
            return;
        };
        let request = match self.bulk.begin_import(self.profile.has_profile()) {
            Ok(request) => request,
            Err(err) => {
                self.set_status(err.to_string());
                return;
            }
        };
        self.set_status(format!("Importing {} questions...", request.amount));
        let client = self.trivia.clone();
        self.spawn_call(async move {
            let mut rng = StdRng::from_os_rng();
            CallOutcome::Imported(trivia::import(&client, &request, &session, &mut rng).await)
        });
    }

    pub fn handle_outcome(&mut self, outcome: CallOutcome) {
        match outcome {
            CallOutcome::ProfileLoaded { account, result } => {
                if let Err(err) = &result {
                    self.push_errors(vec![format!("Loading profile failed: {err}")]);
                }
                self.profile.finish_load(account, result);
            }
            CallOutcome::ProfileSaved { write, result } => {
                let failure = result
                    .as_ref()
                    .err()
                    .map(|err| format!("Saving profile failed: {err}"));
                let name = write.display_name().to_owned();
                if self.profile.finish_save(write, result) {
                    self.set_status(format!("Profile saved as {name}"));
                }
                self.push_errors(failure.into_iter().collect());
            }
            CallOutcome::QuizzesFetched(result) => {
                if let Err(err) = &result {
                    self.push_errors(vec![format!("Loading quizzes failed: {err}")]);
                }
                self.quiz.finish_fetch(result);
            }
            CallOutcome::Answered { call, result } => {
                let failure = result
                    .as_ref()
                    .err()
                    .map(|err| format!("Submitting answer failed: {err}"));
                let awarded = result.as_ref().ok().and_then(Receipt::points_awarded);
                if self.quiz.finish_answer(&call, result, &mut self.profile) {
                    let answers = match &call {
                        AnswerCall::Single { .. } => 1,
                        AnswerCall::Batch { quiz_ids, .. } => quiz_ids.len(),
                    };
                    self.set_status(match awarded {
                        Some(points) => format!("{answers} answer(s) submitted, +{points} points"),
                        None => format!("{answers} answer(s) submitted, no points this time"),
                    });
                    match self.session() {
                        Some(session) => self.spawn_quiz_fetch(&session),
                        None => self.quiz.reset(),
                    }
                }
                self.push_errors(failure.into_iter().collect());
            }
            CallOutcome::Rated { call, result } => {
                let failure = result
                    .as_ref()
                    .err()
                    .map(|err| format!("Rating quiz failed: {err}"));
                if self.quiz.finish_rate(call, result, &mut self.profile) {
                    self.set_status(if call.positive {
                        "Rated quiz up"
                    } else {
                        "Rated quiz down"
                    });
                }
                self.push_errors(failure.into_iter().collect());
            }
            CallOutcome::QuizCreated(result) => {
                let failure = result
                    .as_ref()
                    .err()
                    .map(|err| format!("Creating quiz failed: {err}"));
                if self.draft.finish_save(result) {
                    self.set_status("Quiz created");
                }
                self.push_errors(failure.into_iter().collect());
            }
            CallOutcome::LeaderboardFetched(result) => {
                if let Err(err) = &result {
                    self.push_errors(vec![format!("Loading leaderboard failed: {err}")]);
                }
                self.leaderboard.finish_fetch(result);
            }
            CallOutcome::Imported(result) => match self.bulk.finish_import(result) {
                Ok(created) => {
                    self.set_status(format!("Imported {created} quizzes"));
                    if let Some(session) = self.session() {
                        self.fetch_quizzes(&session);
                    }
                }
                Err(err) => self.push_errors(vec![format!("Import failed: {err:#}")]),
            },
        }
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let connection = self.tracker.state();
        let account = connection.account();
        let wallet = self.tracker.wallet();
        let network = wallet
            .map(|w| {
                let chain_id = w.current_chain_id();
                match Network::from_chain_id(chain_id) {
                    Some(network) => format!("{network} ({chain_id})"),
                    None => format!("Unknown ({chain_id})"),
                }
            })
            .unwrap_or_else(|| String::from("-"));
        let quiz = match (account, connection.manager()) {
            (Some(account), Some(manager)) => QuizView {
                phase: self.quiz.phase(),
                candidate: self.quiz.candidate().cloned(),
                creator: self
                    .quiz
                    .candidate()
                    .map(|q| creator_label(q, Some(account)))
                    .unwrap_or_default(),
                selected_option: self.quiz.selected_option(),
                batch_mode: self.quiz.batch_mode(),
                batch_len: self.quiz.batch().len(),
                pool_len: self.quiz.pool().len(),
                can_skip: self.quiz.can_skip(),
                answer_blocker: self
                    .quiz
                    .answer_blocker(account, manager)
                    .map(|b| b.message()),
                rate_blocker: self
                    .quiz
                    .rate_blocker(account, self.profile.points())
                    .map(|b| b.message()),
                sending_answer: self.quiz.is_sending_answer(),
                rating: self.quiz.is_rating(),
            },
            _ => QuizView::default(),
        };
        let provider = self.bulk.provider();
        AppSnapshot {
            connection,
            network,
            wallet_accounts: wallet.map(LocalWallet::accounts).unwrap_or_default(),
            requires_password: wallet.is_some_and(|w| w.requires_password()),
            display_name: self.profile.display_name().map(str::to_owned),
            points: self.profile.points(),
            profile_loading: self.profile.is_loading(),
            profile_saving: self.profile.is_saving(),
            profile_open: self.profile.is_editor_open(),
            quiz,
            leaderboard: self.leaderboard.entries().to_vec(),
            leaderboard_loading: self.leaderboard.is_loading(),
            draft: self.draft.draft().clone(),
            draft_open: self.draft.is_open(),
            draft_saving: self.draft.is_saving(),
            can_author: self.can_author(),
            bulk: BulkView {
                provider: provider.name,
                enabled: provider.enabled,
                category: self.bulk.category().map(|c| c.label),
                difficulty: self.bulk.difficulty().map(|c| c.label),
                count: self.bulk.count(),
                importing: self.bulk.is_importing(),
            },
            status: self.status.clone(),
            errors: self
                .errors
                .iter()
                .rev()
                .take(VISIBLE_ERRORS)
                .cloned()
                .collect(),
        }
    }
}

fn draft_field(draft: &mut NewQuizDraft, field: ui::DraftField) -> Option<&mut String> {
    match field {
        ui::DraftField::Question => Some(draft.question_mut()),
        ui::DraftField::Option(idx) => draft.option_mut(idx),
    }
}

async fn next_wallet_event(subscription: &mut Option<WalletSubscription>) -> Option<WalletEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

fn show_processing_status(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
    message: impl Into<String>,
    context: &'static str,
) -> Result<()> {
    controller.set_status(message);
    ui::draw(ui_state, &controller.snapshot()).wrap_err(context)
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let (controller, outcomes) = AppController::new(config).await?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, outcomes, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    mut controller: AppController,
    mut outcomes: mpsc::UnboundedReceiver<CallOutcome>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");
    let mut wallet_events = controller.subscribe();
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;
    controller.initialize().await;
    ui::draw(ui_state, &controller.snapshot()).wrap_err("draw after initialization failed")?;

    loop {
        tokio::select! {
            Some(outcome) = outcomes.recv() => {
                controller.handle_outcome(outcome);
            }
            Some(event) = next_wallet_event(&mut wallet_events) => {
                info!(?event, "wallet event");
                controller.handle_wallet_event(event).await;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                if let ui::UserEvent::Connect { password: Some(_), .. } = &ev {
                    show_processing_status(
                        &mut controller,
                        ui_state,
                        "Unlocking wallet...",
                        "draw while unlocking wallet failed",
                    )?;
                }
                if controller.handle_event(ev).await? == Flow::Quit {
                    break;
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    Ok(())
}
