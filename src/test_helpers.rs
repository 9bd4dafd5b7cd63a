use crate::{
    gateway::{
        AccountRequest,
        ContractDirectory,
        LeaderboardColumns,
        QuizBatch,
        QuizContract,
        Session,
        WalletEvent,
        WalletEvents,
        WalletProvider,
        WalletSubscription,
    },
    model::{
        Address,
        ContractEvent,
        Quiz,
        Receipt,
        User,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

/// Contract call as seen by [`FakeContract`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Manager,
    Leaderboard(Address),
    GetLeaderboard,
    GetQuizzes { with_user_status: bool },
    CreateQuiz {
        question: String,
        options: Vec<String>,
        correct_option: usize,
        imported: bool,
    },
    BatchCreateQuiz(QuizBatch),
    CreateUser(String),
    EditUser(String),
    AnswerQuiz { quiz_id: u64, option: usize },
    BatchAnswerQuiz { quiz_ids: Vec<u64>, options: Vec<usize> },
    RateQuiz { quiz_id: u64, positive: bool },
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Call::Manager | Call::Leaderboard(_) | Call::GetLeaderboard | Call::GetQuizzes { .. }
        )
    }
}

#[derive(Debug, Default)]
struct FakeState {
    manager: Address,
    fail_manager: bool,
    fail_reads: bool,
    fail_writes: bool,
    users: HashMap<Address, User>,
    columns: LeaderboardColumns,
    quizzes: Vec<Quiz>,
    points_per_answer: Option<u64>,
    mark_answered: bool,
    calls: Vec<Call>,
}

/// Scripted contract that records every call.
#[derive(Clone, Debug, Default)]
pub struct FakeContract {
    state: Arc<Mutex<FakeState>>,
}

impl FakeContract {
    pub fn new(manager: Address) -> Self {
        let contract = Self::default();
        contract.with(|s| {
            s.manager = manager;
            s.mark_answered = true;
        });
        contract
    }

    fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn record(&self, call: Call) -> Result<()> {
        self.with(|s| {
            let failing = if call.is_write() {
                s.fail_writes
            } else {
                s.fail_reads
            };
            s.calls.push(call);
            if failing {
                Err(eyre!("scripted failure"))
            } else {
                Ok(())
            }
        })
    }

    pub fn fail_manager_reads(&self) {
        self.with(|s| s.fail_manager = true);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.with(|s| s.fail_writes = fail);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.with(|s| s.fail_reads = fail);
    }

    pub fn set_user(&self, account: Address, user: User) {
        self.with(|s| s.users.insert(account, user));
    }

    pub fn set_quizzes(&self, quizzes: Vec<Quiz>) {
        self.with(|s| s.quizzes = quizzes);
    }

    pub fn set_leaderboard(&self, columns: LeaderboardColumns) {
        self.with(|s| s.columns = columns);
    }

    /// Answers award this many points per answered quiz through `PointsAwarded`.
    pub fn award_points(&self, amount: Option<u64>) {
        self.with(|s| s.points_per_answer = amount);
    }

    /// Whether answering flips `user_has_answered` on later fetches.
    pub fn mark_answered(&self, mark: bool) {
        self.with(|s| s.mark_answered = mark);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    fn answered(&self, quiz_ids: &[u64], from: Address) -> Receipt {
        self.with(|s| {
            if s.mark_answered {
                for quiz in s.quizzes.iter_mut().filter(|q| quiz_ids.contains(&q.id)) {
                    quiz.user_has_answered = true;
                    quiz.number_of_responses += 1;
                }
            }
            let events = s
                .points_per_answer
                .map(|amount| {
                    vec![ContractEvent::PointsAwarded {
                        user: from,
                        amount: amount * quiz_ids.len() as u64,
                    }]
                })
                .unwrap_or_default();
            Receipt::new(events)
        })
    }
}

impl QuizContract for FakeContract {
    async fn manager(&self) -> Result<Address> {
        self.record(Call::Manager)?;
        self.with(|s| {
            if s.fail_manager {
                Err(eyre!("manager read failed"))
            } else {
                Ok(s.manager)
            }
        })
    }

    async fn leaderboard(&self, account: Address) -> Result<User> {
        self.record(Call::Leaderboard(account))?;
        Ok(self.with(|s| s.users.get(&account).cloned().unwrap_or_default()))
    }

    async fn get_leaderboard(&self) -> Result<LeaderboardColumns> {
        self.record(Call::GetLeaderboard)?;
        Ok(self.with(|s| s.columns.clone()))
    }

    async fn get_quizzes(&self, with_user_status: bool, _from: Address) -> Result<Vec<Quiz>> {
        self.record(Call::GetQuizzes { with_user_status })?;
        Ok(self.with(|s| s.quizzes.clone()))
    }

    async fn create_quiz(
        &self,
        question: String,
        options: Vec<String>,
        correct_option: usize,
        imported: bool,
        _from: Address,
    ) -> Result<Receipt> {
        self.record(Call::CreateQuiz {
            question,
            options,
            correct_option,
            imported,
        })?;
        Ok(Receipt::default())
    }

    async fn batch_create_quiz(&self, batch: QuizBatch, _from: Address) -> Result<Receipt> {
        self.record(Call::BatchCreateQuiz(batch))?;
        Ok(Receipt::default())
    }

    async fn create_user(&self, display_name: String, _from: Address) -> Result<Receipt> {
        self.record(Call::CreateUser(display_name))?;
        Ok(Receipt::default())
    }

    async fn edit_user(&self, display_name: String, _from: Address) -> Result<Receipt> {
        self.record(Call::EditUser(display_name))?;
        Ok(Receipt::default())
    }

    async fn answer_quiz(&self, quiz_id: u64, option: usize, from: Address) -> Result<Receipt> {
        self.record(Call::AnswerQuiz { quiz_id, option })?;
        Ok(self.answered(&[quiz_id], from))
    }

    async fn batch_answer_quiz(
        &self,
        quiz_ids: Vec<u64>,
        options: Vec<usize>,
        from: Address,
    ) -> Result<Receipt> {
        self.record(Call::BatchAnswerQuiz {
            quiz_ids: quiz_ids.clone(),
            options,
        })?;
        Ok(self.answered(&quiz_ids, from))
    }

    async fn rate_quiz(&self, quiz_id: u64, positive: bool, _from: Address) -> Result<Receipt> {
        self.record(Call::RateQuiz { quiz_id, positive })?;
        Ok(Receipt::default())
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeDirectory {
    contracts: HashMap<(u64, Address), FakeContract>,
}

impl FakeDirectory {
    pub fn with(chain_id: u64, address: Address, contract: FakeContract) -> Self {
        let mut directory = Self::default();
        directory.contracts.insert((chain_id, address), contract);
        directory
    }
}

impl ContractDirectory for FakeDirectory {
    type Contract = FakeContract;

    fn instantiate(&self, chain_id: u64, address: Address) -> Result<FakeContract> {
        self.contracts
            .get(&(chain_id, address))
            .cloned()
            .ok_or_else(|| eyre!("no fake contract at {address} on {chain_id}"))
    }
}

#[derive(Debug, Default)]
struct FakeWalletState {
    chain_id: u64,
    fail_chain_id: bool,
    selected: Option<Address>,
    approvals: Vec<Address>,
}

/// Scripted wallet provider.
#[derive(Clone, Debug, Default)]
pub struct FakeWallet {
    state: Arc<Mutex<FakeWalletState>>,
    events: WalletEvents,
}

impl FakeWallet {
    pub fn new(chain_id: u64) -> Self {
        let wallet = Self::default();
        wallet.state.lock().unwrap().chain_id = chain_id;
        wallet
    }

    pub fn with_selected(self, account: Address) -> Self {
        self.state.lock().unwrap().selected = Some(account);
        self
    }

    pub fn with_approvals(self, accounts: Vec<Address>) -> Self {
        self.state.lock().unwrap().approvals = accounts;
        self
    }

    pub fn fail_chain_id(&self) {
        self.state.lock().unwrap().fail_chain_id = true;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn emit(&self, event: WalletEvent) {
        self.events.emit(event);
    }
}

impl WalletProvider for FakeWallet {
    async fn chain_id(&self) -> Result<u64> {
        let state = self.state.lock().unwrap();
        if state.fail_chain_id {
            return Err(eyre!("chain id unavailable"));
        }
        Ok(state.chain_id)
    }

    fn selected_address(&self) -> Option<Address> {
        self.state.lock().unwrap().selected
    }

    fn requires_password(&self) -> bool {
        false
    }

    async fn request_accounts(&self, _request: AccountRequest) -> Result<Vec<Address>> {
        let mut state = self.state.lock().unwrap();
        if state.approvals.is_empty() {
            return Err(eyre!("user rejected the request"));
        }
        state.selected = state.approvals.first().copied();
        Ok(state.approvals.clone())
    }

    fn subscribe(&self) -> WalletSubscription {
        self.events.subscribe()
    }
}

pub const MANAGER: Address = Address::new([0xaa; 20]);
pub const ALICE: Address = Address::new([0x01; 20]);
pub const BOB: Address = Address::new([0x02; 20]);
pub const CAROL: Address = Address::new([0x03; 20]);

pub fn session(account: Address, contract: FakeContract) -> Session<FakeContract> {
    Session {
        account,
        manager: MANAGER,
        chain_id: 1337,
        contract,
    }
}

pub fn quiz(id: u64, creator: Address) -> Quiz {
    Quiz {
        id,
        question: format!("Question {id}?"),
        options: vec!["yes".into(), "no".into(), "maybe".into()],
        correct_option: 0,
        total_ratings: 0,
        positive_ratings: 0,
        number_of_responses: 0,
        creator,
        user_has_answered: false,
        user_has_rated: false,
    }
}

pub fn user(name: &str, points: i64) -> User {
    User {
        display_name: Some(name.to_owned()),
        points: Some(points),
    }
}
