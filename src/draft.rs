use crate::{
    gateway::{
        QuizContract,
        Session,
    },
    model::{
        Address,
        MIN_QUIZ_OPTIONS,
        Receipt,
    },
};
use color_eyre::eyre::Result;
use tracing::{
    info,
    warn,
};

/// Quiz being written by the user. Never leaves the client until saved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewQuizDraft {
    question: String,
    options: Vec<String>,
    correct_option: Option<usize>,
}

impl Default for NewQuizDraft {
    fn default() -> Self {
        Self {
            question: String::new(),
            options: vec![String::new(); MIN_QUIZ_OPTIONS],
            correct_option: None,
        }
    }
}

impl NewQuizDraft {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_option(&self) -> Option<usize> {
        self.correct_option
    }

    pub fn question_mut(&mut self) -> &mut String {
        &mut self.question
    }

    pub fn option_mut(&mut self, idx: usize) -> Option<&mut String> {
        self.options.get_mut(idx)
    }

    pub fn add_option(&mut self) {
        self.options.push(String::new());
    }

    pub fn can_remove_option(&self, idx: usize) -> bool {
        idx < self.options.len()
            && self.options.len() > MIN_QUIZ_OPTIONS
            && self.correct_option != Some(idx)
    }

    /// Removes an option, keeping the correct mark on the same text.
    pub fn remove_option(&mut self, idx: usize) -> bool {
        if !self.can_remove_option(idx) {
            return false;
        }
        self.options.remove(idx);
        if let Some(correct) = self.correct_option
            && correct > idx
        {
            self.correct_option = Some(correct - 1);
        }
        true
    }

    /// Marks `idx` as the answer, or clears the mark if it already is.
    pub fn toggle_correct(&mut self, idx: usize) {
        if idx >= self.options.len() {
            return;
        }
        self.correct_option = if self.correct_option == Some(idx) {
            None
        } else {
            Some(idx)
        };
    }

    pub fn is_complete(&self) -> bool {
        !self.question.is_empty()
            && self.options.len() >= MIN_QUIZ_OPTIONS
            && self.options.iter().all(|option| !option.is_empty())
            && self.correct_option.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateQuizCall {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

impl CreateQuizCall {
    pub async fn send<C: QuizContract>(self, contract: &C, from: Address) -> Result<Receipt> {
        contract
            .create_quiz(self.question, self.options, self.correct_option, false, from)
            .await
    }
}

/// Modal state around a [`NewQuizDraft`].
#[derive(Debug, Default)]
pub struct DraftEditor {
    draft: NewQuizDraft,
    open: bool,
    saving: bool,
}

impl DraftEditor {
    pub fn draft(&self) -> &NewQuizDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut NewQuizDraft {
        &mut self.draft
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Closing discards the draft.
    pub fn close(&mut self) {
        self.open = false;
        self.draft = NewQuizDraft::default();
    }

    /// `can_author` is true when connected with an account that has a profile.
    pub fn can_save(&self, can_author: bool) -> bool {
        can_author && !self.saving && self.draft.is_complete()
    }

    pub fn begin_save(&mut self, can_author: bool) -> Option<CreateQuizCall> {
        if !self.can_save(can_author) {
            return None;
        }
        let correct_option = self.draft.correct_option?;
        self.saving = true;
        Some(CreateQuizCall {
            question: self.draft.question.clone(),
            options: self.draft.options.clone(),
            correct_option,
        })
    }

    /// The draft is reset and the editor closed whatever the outcome.
    pub fn finish_save(&mut self, result: Result<Receipt>) -> bool {
        self.saving = false;
        self.close();
        match result {
            Ok(_) => {
                info!("quiz created");
                true
            }
            Err(err) => {
                warn!(?err, "creating quiz failed");
                false
            }
        }
    }

    pub async fn save<C: QuizContract>(
        &mut self,
        session: Option<&Session<C>>,
        has_profile: bool,
    ) -> bool {
        let Some(session) = session else {
            return false;
        };
        let Some(call) = self.begin_save(has_profile) else {
            return false;
        };
        let result = call.send(&session.contract, session.account).await;
        self.finish_save(result)
    }
}
