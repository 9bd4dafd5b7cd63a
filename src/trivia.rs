use crate::gateway::{
    QuizBatch,
    QuizContract,
    Session,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use rand::Rng;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{
    info,
    warn,
};

pub const OPEN_TRIVIA_URL: &str = "https://opentdb.com/api.php";
pub const QUIZ_API_URL: &str = "https://quizapi.io/api/v1/questions";
pub const MAX_BULK_COUNT: u32 = 10;
pub const ANY: &str = "any";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
}

const fn choice(value: &'static str, label: &'static str) -> Choice {
    Choice { value, label }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriviaProvider {
    pub name: &'static str,
    pub url: &'static str,
    pub enabled: bool,
    pub categories: &'static [Choice],
    pub difficulties: &'static [Choice],
}

const OPEN_TRIVIA_CATEGORIES: &[Choice] = &[
    choice(ANY, "Any Category"),
    choice("9", "General Knowledge"),
    choice("10", "Books"),
    choice("11", "Film"),
    choice("12", "Music"),
    choice("15", "Games"),
    choice("14", "Television"),
    choice("16", "Board Games"),
    choice("17", "Science & Nature"),
    choice("18", "Computers"),
    choice("19", "Mathematics"),
    choice("20", "Mythology"),
    choice("21", "Sports"),
    choice("22", "Geography"),
    choice("23", "History"),
    choice("24", "Politics"),
    choice("25", "Art"),
    choice("26", "Celebrities"),
    choice("27", "Animals"),
];

const DIFFICULTIES: &[Choice] = &[
    choice(ANY, "Any Difficulty"),
    choice("easy", "Easy"),
    choice("medium", "Medium"),
    choice("hard", "Hard"),
];

const QUIZ_API_CATEGORIES: &[Choice] = &[
    choice("linux", "Linux"),
    choice("bash", "Bash"),
    choice("sql", "SQL"),
    choice("docker", "Docker"),
    choice("devops", "DevOps"),
];

pub const PROVIDERS: [TriviaProvider; 2] = [
    TriviaProvider {
        name: "Open Trivia DB",
        url: OPEN_TRIVIA_URL,
        enabled: true,
        categories: OPEN_TRIVIA_CATEGORIES,
        difficulties: DIFFICULTIES,
    },
    TriviaProvider {
        name: "QuizAPI",
        url: QUIZ_API_URL,
        enabled: false,
        categories: QUIZ_API_CATEGORIES,
        difficulties: DIFFICULTIES,
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BulkRequestError {
    #[error("number of questions must be between 1 and 10, got {0}")]
    CountOutOfRange(u32),
    #[error("select a category")]
    NoCategory,
    #[error("select a difficulty")]
    NoDifficulty,
    #[error("{0} is not available yet")]
    ProviderDisabled(&'static str),
    #[error("connect an account with a profile to import quizzes")]
    NotAuthorized,
    #[error("an import is already running")]
    InFlight,
}

/// Validated parameters for one provider request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkRequest {
    pub amount: u32,
    pub category: String,
    pub difficulty: String,
}

impl BulkRequest {
    pub fn new(amount: u32, category: &str, difficulty: &str) -> Result<Self, BulkRequestError> {
        if !(1..=MAX_BULK_COUNT).contains(&amount) {
            return Err(BulkRequestError::CountOutOfRange(amount));
        }
        if category.is_empty() {
            return Err(BulkRequestError::NoCategory);
        }
        if difficulty.is_empty() {
            return Err(BulkRequestError::NoDifficulty);
        }
        Ok(Self {
            amount,
            category: category.to_owned(),
            difficulty: difficulty.to_owned(),
        })
    }

    /// `category` and `difficulty` are left out when set to "any".
    pub fn url(&self, base: &str) -> String {
        let mut url = format!("{base}?amount={}&type=multiple", self.amount);
        if self.category != ANY {
            url.push_str(&format!("&category={}", self.category));
        }
        if self.difficulty != ANY {
            url.push_str(&format!("&difficulty={}", self.difficulty));
        }
        url
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TriviaQuestion {
    pub question: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TriviaResponse {
    response_code: u32,
    #[serde(default)]
    results: Vec<TriviaQuestion>,
}

#[derive(Clone, Debug)]
pub struct TriviaClient {
    base_url: String,
    http: reqwest::Client,
}

impl TriviaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for trivia provider")?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch(&self, request: &BulkRequest) -> Result<Vec<TriviaQuestion>> {
        let url = request.url(&self.base_url);
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .wrap_err("trivia request failed")?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .wrap_err("failed to read trivia response body")?;
        if status != StatusCode::OK {
            let body = String::from_utf8_lossy(&bytes);
            return Err(eyre!("trivia provider responded with {status}: {body}"));
        }
        let response: TriviaResponse =
            serde_json::from_slice(&bytes).wrap_err("invalid trivia payload")?;
        if response.response_code != 0 {
            return Err(eyre!(
                "trivia provider returned response code {}",
                response.response_code
            ));
        }
        info!(%url, questions = response.results.len(), "trivia questions fetched");
        Ok(response.results)
    }
}

/// Inserts the correct answer at a uniformly random position among the
/// incorrect ones and returns the options with the correct index.
pub fn create_choices(
    incorrect: Vec<String>,
    correct: String,
    rng: &mut impl Rng,
) -> (Vec<String>, usize) {
    let idx = rng.random_range(0..=incorrect.len());
    let mut options = incorrect;
    options.insert(idx, correct);
    (options, idx)
}

pub fn build_batch(questions: Vec<TriviaQuestion>, rng: &mut impl Rng) -> QuizBatch {
    let mut batch = QuizBatch::default();
    for question in questions {
        let (options, correct) =
            create_choices(question.incorrect_answers, question.correct_answer, rng);
        batch.questions.push(question.question);
        batch.option_sets.push(options);
        batch.correct_options.push(correct);
    }
    batch
}

/// Decodes the HTML entities the trivia providers put in question text.
pub fn decode_html_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Form state of the bulk import page.
#[derive(Debug)]
pub struct BulkForm {
    provider: usize,
    category: Option<usize>,
    difficulty: Option<usize>,
    count: u32,
    importing: bool,
}

impl Default for BulkForm {
    fn default() -> Self {
        Self {
            provider: 0,
            category: None,
            difficulty: None,
            count: 5,
            importing: false,
        }
    }
}

impl BulkForm {
    pub fn provider(&self) -> &'static TriviaProvider {
        &PROVIDERS[self.provider % PROVIDERS.len()]
    }

    pub fn category(&self) -> Option<&'static Choice> {
        self.category.and_then(|idx| self.provider().categories.get(idx))
    }

    pub fn difficulty(&self) -> Option<&'static Choice> {
        self.difficulty
            .and_then(|idx| self.provider().difficulties.get(idx))
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_importing(&self) -> bool {
        self.importing
    }

    /// Switching provider clears the category and difficulty.
    pub fn next_provider(&mut self) {
        self.provider = (self.provider + 1) % PROVIDERS.len();
        self.category = None;
        self.difficulty = None;
    }

    pub fn next_category(&mut self) {
        self.category = Some(cycle(self.category, self.provider().categories.len()));
    }

    pub fn next_difficulty(&mut self) {
        self.difficulty = Some(cycle(self.difficulty, self.provider().difficulties.len()));
    }

    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn decrement(&mut self) {
        self.count = self.count.saturating_sub(1);
    }

    pub fn request(&self) -> Result<BulkRequest, BulkRequestError> {
        let provider = self.provider();
        if !provider.enabled {
            return Err(BulkRequestError::ProviderDisabled(provider.name));
        }
        let category = self.category().map(|c| c.value).unwrap_or_default();
        let difficulty = self.difficulty().map(|c| c.value).unwrap_or_default();
        BulkRequest::new(self.count, category, difficulty)
    }

    /// `can_author` is true when connected with an account that has a profile.
    pub fn begin_import(&mut self, can_author: bool) -> Result<BulkRequest, BulkRequestError> {
        let request = self.request()?;
        if !can_author {
            return Err(BulkRequestError::NotAuthorized);
        }
        if self.importing {
            return Err(BulkRequestError::InFlight);
        }
        self.importing = true;
        Ok(request)
    }

    /// Number of quizzes created, or the failure to report.
    pub fn finish_import(&mut self, result: Result<usize>) -> Result<usize> {
        self.importing = false;
        match &result {
            Ok(created) => info!(created, "bulk import finished"),
            Err(err) => warn!(?err, "bulk import failed"),
        }
        result
    }
}

fn cycle(current: Option<usize>, len: usize) -> usize {
    match current {
        Some(idx) if len > 0 => (idx + 1) % len,
        _ => 0,
    }
}

/// Fetches a question set and submits it in one `batchCreateQuiz`.
pub async fn import<C: QuizContract>(
    client: &TriviaClient,
    request: &BulkRequest,
    session: &Session<C>,
    rng: &mut (impl Rng + Send),
) -> Result<usize> {
    let questions = client.fetch(request).await?;
    if questions.is_empty() {
        return Err(eyre!("trivia provider returned no questions"));
    }
    let batch = build_batch(questions, rng);
    let count = batch.len();
    let receipt = session
        .contract
        .batch_create_quiz(batch, session.account)
        .await
        .wrap_err("batchCreateQuiz failed")?;
    info!(count, events = receipt.events.len(), "imported trivia questions");
    Ok(count)
}
