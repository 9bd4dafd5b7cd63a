use crate::{
    gateway::{
        ContractDirectory,
        LeaderboardColumns,
        QuizBatch,
        QuizContract,
    },
    model::{
        Address,
        ContractEvent,
        MIN_QUIZ_OPTIONS,
        Quiz,
        Receipt,
        User,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use rand::{
    Rng,
    seq::IndexedRandom,
};
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::{
        Arc,
        Mutex,
    },
};
use thiserror::Error;

/// Points awarded for a correct answer.
pub const ANSWER_REWARD: u64 = 3;
/// Points the creator earns from a positive rating.
pub const POSITIVE_RATING_REWARD: u64 = 1;
pub const RATING_COST: u64 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Revert {
    #[error("caller has no profile")]
    NoProfile,
    #[error("profile already exists")]
    ProfileExists,
    #[error("display name must not be empty")]
    EmptyDisplayName,
    #[error("quiz {0} does not exist")]
    UnknownQuiz(u64),
    #[error("quiz {0} already answered")]
    AlreadyAnswered(u64),
    #[error("quiz {0} was created by the caller")]
    OwnQuiz(u64),
    #[error("the manager cannot answer quizzes")]
    ManagerCannotAnswer,
    #[error("quiz {0} already rated")]
    AlreadyRated(u64),
    #[error("not enough points: have {have}, need {need}")]
    InsufficientPoints { have: u64, need: u64 },
    #[error("option {option} is out of range for quiz {quiz_id}")]
    InvalidOption { quiz_id: u64, option: usize },
    #[error("a quiz needs a question, at least two non-empty options and a valid answer")]
    MalformedQuiz,
    #[error("batch arguments have different lengths")]
    LengthMismatch,
    #[error("batch is empty")]
    EmptyBatch,
}

#[derive(Debug, Clone)]
struct Profile {
    display_name: String,
    points: u64,
}

#[derive(Debug, Clone)]
struct StoredQuiz {
    id: u64,
    question: String,
    options: Vec<String>,
    correct_option: usize,
    creator: Address,
    imported: bool,
    answered_by: HashSet<Address>,
    rated_by: HashSet<Address>,
    total_ratings: u64,
    positive_ratings: u64,
}

impl StoredQuiz {
    fn view(&self, caller: Option<Address>) -> Quiz {
        Quiz {
            id: self.id,
            question: self.question.clone(),
            options: self.options.clone(),
            correct_option: self.correct_option,
            total_ratings: self.total_ratings,
            positive_ratings: self.positive_ratings,
            number_of_responses: self.answered_by.len() as u64,
            creator: self.creator,
            user_has_answered: caller.is_some_and(|c| self.answered_by.contains(&c)),
            user_has_rated: caller.is_some_and(|c| self.rated_by.contains(&c)),
        }
    }
}

#[derive(Debug, Default)]
struct ChainState {
    manager: Address,
    profiles: HashMap<Address, Profile>,
    registration_order: Vec<Address>,
    quizzes: Vec<StoredQuiz>,
}

impl ChainState {
    fn require_profile(&self, caller: Address) -> Result<(), Revert> {
        if self.profiles.contains_key(&caller) {
            Ok(())
        } else {
            Err(Revert::NoProfile)
        }
    }

    fn check_new_quiz(
        question: &str,
        options: &[String],
        correct_option: usize,
    ) -> Result<(), Revert> {
        let well_formed = !question.trim().is_empty()
            && options.len() >= MIN_QUIZ_OPTIONS
            && options.iter().all(|o| !o.trim().is_empty())
            && correct_option < options.len();
        if well_formed {
            Ok(())
        } else {
            Err(Revert::MalformedQuiz)
        }
    }

    fn push_quiz(
        &mut self,
        question: String,
        options: Vec<String>,
        correct_option: usize,
        imported: bool,
        creator: Address,
    ) -> ContractEvent {
        let id = self.quizzes.len() as u64;
        self.quizzes.push(StoredQuiz {
            id,
            question,
            options,
            correct_option,
            creator,
            imported,
            answered_by: HashSet::new(),
            rated_by: HashSet::new(),
            total_ratings: 0,
            positive_ratings: 0,
        });
        ContractEvent::QuizCreated { id, creator }
    }

    fn check_answer(
        &self,
        quiz_id: u64,
        option: usize,
        caller: Address,
        pending: &HashSet<u64>,
    ) -> Result<(), Revert> {
        if caller == self.manager {
            return Err(Revert::ManagerCannotAnswer);
        }
        let quiz = self
            .quizzes
            .get(quiz_id as usize)
            .ok_or(Revert::UnknownQuiz(quiz_id))?;
        if quiz.creator == caller {
            return Err(Revert::OwnQuiz(quiz_id));
        }
        if quiz.answered_by.contains(&caller) || pending.contains(&quiz_id) {
            return Err(Revert::AlreadyAnswered(quiz_id));
        }
        if option >= quiz.options.len() {
            return Err(Revert::InvalidOption { quiz_id, option });
        }
        Ok(())
    }

    /// Records validated answers, returning the points earned.
    fn apply_answers(&mut self, answers: &[(u64, usize)], caller: Address) -> u64 {
        let mut earned = 0;
        for (quiz_id, option) in answers {
            if let Some(quiz) = self.quizzes.get_mut(*quiz_id as usize) {
                quiz.answered_by.insert(caller);
                if quiz.correct_option == *option {
                    earned += ANSWER_REWARD;
                }
            }
        }
        if let Some(profile) = self.profiles.get_mut(&caller) {
            profile.points += earned;
        }
        earned
    }

    fn answer_all(&mut self, answers: &[(u64, usize)], caller: Address) -> Result<Receipt, Revert> {
        self.require_profile(caller)?;
        let mut pending = HashSet::new();
        for (quiz_id, option) in answers {
            self.check_answer(*quiz_id, *option, caller, &pending)?;
            pending.insert(*quiz_id);
        }
        let earned = self.apply_answers(answers, caller);
        let events = if earned > 0 {
            vec![ContractEvent::PointsAwarded {
                user: caller,
                amount: earned,
            }]
        } else {
            Vec::new()
        };
        Ok(Receipt::new(events))
    }
}

/// In-memory stand-in for the deployed quiz contract.
#[derive(Clone, Debug)]
pub struct SandboxContract {
    address: Address,
    state: Arc<Mutex<ChainState>>,
}

impl SandboxContract {
    pub fn deploy(address: Address, manager: Address) -> Self {
        tracing::info!(%address, %manager, "sandbox contract deployed");
        Self {
            address,
            state: Arc::new(Mutex::new(ChainState {
                manager,
                ..ChainState::default()
            })),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ChainState) -> Result<T, Revert>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| eyre!("sandbox state poisoned"))?;
        f(&mut state).map_err(|revert| eyre!("transaction reverted: {revert}"))
    }

    /// Whether the stored quiz was created through a bulk import.
    pub fn is_imported(&self, quiz_id: u64) -> Result<bool> {
        self.with_state(|state| {
            state
                .quizzes
                .get(quiz_id as usize)
                .map(|q| q.imported)
                .ok_or(Revert::UnknownQuiz(quiz_id))
        })
    }

    pub fn quiz_count(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.quizzes.len()))
    }
}

impl QuizContract for SandboxContract {
    async fn manager(&self) -> Result<Address> {
        self.with_state(|state| Ok(state.manager))
    }

    async fn leaderboard(&self, account: Address) -> Result<User> {
        self.with_state(|state| {
            let user = match state.profiles.get(&account) {
                Some(profile) => User {
                    display_name: Some(profile.display_name.clone()),
                    points: Some(i64::try_from(profile.points).unwrap_or(i64::MAX)),
                },
                None => User {
                    display_name: None,
                    points: Some(0),
                },
            };
            Ok(user)
        })
    }

    async fn get_leaderboard(&self) -> Result<LeaderboardColumns> {
        self.with_state(|state| {
            let mut columns = LeaderboardColumns::default();
            for address in &state.registration_order {
                if let Some(profile) = state.profiles.get(address) {
                    columns.addresses.push(*address);
                    columns.display_names.push(profile.display_name.clone());
                    columns.points.push(profile.points);
                }
            }
            Ok(columns)
        })
    }

    async fn get_quizzes(&self, with_user_status: bool, from: Address) -> Result<Vec<Quiz>> {
        let caller = with_user_status.then_some(from);
        self.with_state(|state| Ok(state.quizzes.iter().map(|q| q.view(caller)).collect()))
    }

    async fn create_quiz(
        &self,
        question: String,
        options: Vec<String>,
        correct_option: usize,
        imported: bool,
        from: Address,
    ) -> Result<Receipt> {
        self.with_state(|state| {
            state.require_profile(from)?;
            ChainState::check_new_quiz(&question, &options, correct_option)?;
            let event = state.push_quiz(question, options, correct_option, imported, from);
            Ok(Receipt::new(vec![event]))
        })
    }

    async fn batch_create_quiz(&self, batch: QuizBatch, from: Address) -> Result<Receipt> {
        self.with_state(|state| {
            state.require_profile(from)?;
            if batch.questions.len() != batch.option_sets.len()
                || batch.questions.len() != batch.correct_options.len()
            {
                return Err(Revert::LengthMismatch);
            }
            if batch.is_empty() {
                return Err(Revert::EmptyBatch);
            }
            for ((question, options), correct) in batch
                .questions
                .iter()
                .zip(&batch.option_sets)
                .zip(&batch.correct_options)
            {
                ChainState::check_new_quiz(question, options, *correct)?;
            }
            let QuizBatch {
                questions,
                option_sets,
                correct_options,
            } = batch;
            let events = questions
                .into_iter()
                .zip(option_sets)
                .zip(correct_options)
                .map(|((question, options), correct)| {
                    state.push_quiz(question, options, correct, true, from)
                })
                .collect();
            Ok(Receipt::new(events))
        })
    }

    async fn create_user(&self, display_name: String, from: Address) -> Result<Receipt> {
        self.with_state(|state| {
            if display_name.is_empty() {
                return Err(Revert::EmptyDisplayName);
            }
            if state.profiles.contains_key(&from) {
                return Err(Revert::ProfileExists);
            }
            state.profiles.insert(
                from,
                Profile {
                    display_name,
                    points: 0,
                },
            );
            state.registration_order.push(from);
            Ok(Receipt::new(vec![ContractEvent::UserCreated { user: from }]))
        })
    }

    async fn edit_user(&self, display_name: String, from: Address) -> Result<Receipt> {
        self.with_state(|state| {
            if display_name.is_empty() {
                return Err(Revert::EmptyDisplayName);
            }
            let profile = state.profiles.get_mut(&from).ok_or(Revert::NoProfile)?;
            profile.display_name = display_name;
            Ok(Receipt::default())
        })
    }

    async fn answer_quiz(&self, quiz_id: u64, option: usize, from: Address) -> Result<Receipt> {
        self.with_state(|state| state.answer_all(&[(quiz_id, option)], from))
    }

    async fn batch_answer_quiz(
        &self,
        quiz_ids: Vec<u64>,
        options: Vec<usize>,
        from: Address,
    ) -> Result<Receipt> {
        self.with_state(|state| {
            if quiz_ids.len() != options.len() {
                return Err(Revert::LengthMismatch);
            }
            if quiz_ids.is_empty() {
                return Err(Revert::EmptyBatch);
            }
            let answers: Vec<_> = quiz_ids.into_iter().zip(options).collect();
            state.answer_all(&answers, from)
        })
    }

    async fn rate_quiz(&self, quiz_id: u64, positive: bool, from: Address) -> Result<Receipt> {
        self.with_state(|state| {
            let have = state
                .profiles
                .get(&from)
                .map(|p| p.points)
                .ok_or(Revert::NoProfile)?;
            let quiz = state
                .quizzes
                .get_mut(quiz_id as usize)
                .ok_or(Revert::UnknownQuiz(quiz_id))?;
            if quiz.creator == from {
                return Err(Revert::OwnQuiz(quiz_id));
            }
            if quiz.rated_by.contains(&from) {
                return Err(Revert::AlreadyRated(quiz_id));
            }
            if have < RATING_COST {
                return Err(Revert::InsufficientPoints {
                    have,
                    need: RATING_COST,
                });
            }
            quiz.rated_by.insert(from);
            quiz.total_ratings += 1;
            if positive {
                quiz.positive_ratings += 1;
            }
            let creator = quiz.creator;
            if let Some(profile) = state.profiles.get_mut(&from) {
                profile.points -= RATING_COST;
            }
            if positive && let Some(profile) = state.profiles.get_mut(&creator) {
                profile.points += POSITIVE_RATING_REWARD;
            }
            Ok(Receipt::new(vec![ContractEvent::QuizRated {
                id: quiz_id,
                rater: from,
                positive,
            }]))
        })
    }
}

/// Contracts deployed to the sandbox, keyed by network id and address.
#[derive(Clone, Debug, Default)]
pub struct SandboxDirectory {
    contracts: Arc<Mutex<HashMap<(u64, Address), SandboxContract>>>,
}

impl SandboxDirectory {
    pub fn deploy(&self, chain_id: u64, manager: Address, rng: &mut impl Rng) -> Result<SandboxContract> {
        let address = Address::new(rng.random::<[u8; 20]>());
        let contract = SandboxContract::deploy(address, manager);
        self.contracts
            .lock()
            .map_err(|_| eyre!("sandbox directory poisoned"))?
            .insert((chain_id, address), contract.clone());
        Ok(contract)
    }
}

impl ContractDirectory for SandboxDirectory {
    type Contract = SandboxContract;

    fn instantiate(&self, chain_id: u64, address: Address) -> Result<SandboxContract> {
        self.contracts
            .lock()
            .map_err(|_| eyre!("sandbox directory poisoned"))?
            .get(&(chain_id, address))
            .cloned()
            .ok_or_else(|| eyre!("No contract at {address} on network {chain_id}"))
    }
}

/// Fills a fresh sandbox with generated users and quizzes so the pool is not
/// empty on first launch. Seeded quizzes belong to the generated users, never
/// to `accounts`.
pub async fn seed(
    contract: &SandboxContract,
    accounts: &[Address],
    quizzes: usize,
    rng: &mut impl Rng,
) -> Result<()> {
    const SEED_AUTHORS: usize = 3;
    let authors: Vec<Address> = (0..SEED_AUTHORS)
        .map(|_| Address::new(rng.random::<[u8; 20]>()))
        .filter(|a| !accounts.contains(a))
        .collect();
    for author in &authors {
        contract.create_user(fakeit::name::full(), *author).await?;
    }
    for _ in 0..quizzes {
        let Some(author) = authors.choose(rng).copied() else {
            break;
        };
        let answer = fakeit::words::word();
        let mut options: Vec<String> = (0..3).map(|_| fakeit::words::word()).collect();
        let correct_option = rng.random_range(0..=options.len());
        options.insert(correct_option, answer.clone());
        let question = format!("Which word did {} pick?", fakeit::name::full());
        contract
            .create_quiz(question, options, correct_option, false, author)
            .await?;
    }
    tracing::info!(authors = authors.len(), quizzes, "sandbox seeded");
    Ok(())
}
