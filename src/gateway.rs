use crate::model::{
    Address,
    Quiz,
    Receipt,
    User,
};
use color_eyre::eyre::Result;
use std::{
    future::Future,
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::mpsc;

/// Three parallel columns as returned by `getLeaderboard`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeaderboardColumns {
    pub addresses: Vec<Address>,
    pub display_names: Vec<String>,
    pub points: Vec<u64>,
}

/// Options and answers for `batchCreateQuiz`, kept as parallel vectors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuizBatch {
    pub questions: Vec<String>,
    pub option_sets: Vec<Vec<String>>,
    pub correct_options: Vec<usize>,
}

impl QuizBatch {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Read and write surface of the quiz contract. Writes carry the sender.
pub trait QuizContract: Clone + Send + Sync + 'static {
    fn manager(&self) -> impl Future<Output = Result<Address>> + Send;

    fn leaderboard(&self, account: Address) -> impl Future<Output = Result<User>> + Send;

    fn get_leaderboard(&self) -> impl Future<Output = Result<LeaderboardColumns>> + Send;

    /// `with_user_status` asks the contract to fill the caller's answered/rated flags.
    fn get_quizzes(
        &self,
        with_user_status: bool,
        from: Address,
    ) -> impl Future<Output = Result<Vec<Quiz>>> + Send;

    fn create_quiz(
        &self,
        question: String,
        options: Vec<String>,
        correct_option: usize,
        imported: bool,
        from: Address,
    ) -> impl Future<Output = Result<Receipt>> + Send;

    fn batch_create_quiz(
        &self,
        batch: QuizBatch,
        from: Address,
    ) -> impl Future<Output = Result<Receipt>> + Send;

    fn create_user(
        &self,
        display_name: String,
        from: Address,
    ) -> impl Future<Output = Result<Receipt>> + Send;

    fn edit_user(
        &self,
        display_name: String,
        from: Address,
    ) -> impl Future<Output = Result<Receipt>> + Send;

    fn answer_quiz(
        &self,
        quiz_id: u64,
        option: usize,
        from: Address,
    ) -> impl Future<Output = Result<Receipt>> + Send;

    fn batch_answer_quiz(
        &self,
        quiz_ids: Vec<u64>,
        options: Vec<usize>,
        from: Address,
    ) -> impl Future<Output = Result<Receipt>> + Send;

    fn rate_quiz(
        &self,
        quiz_id: u64,
        positive: bool,
        from: Address,
    ) -> impl Future<Output = Result<Receipt>> + Send;
}

/// Resolves a deployed contract on a given network.
pub trait ContractDirectory {
    type Contract: QuizContract;

    fn instantiate(&self, chain_id: u64, address: Address) -> Result<Self::Contract>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// What the user handed over when approving an account request.
#[derive(Clone, Debug, Default)]
pub struct AccountRequest {
    pub account: Option<Address>,
    pub password: Option<String>,
}

pub trait WalletProvider: Send + Sync {
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    fn selected_address(&self) -> Option<Address>;

    fn requires_password(&self) -> bool;

    fn request_accounts(
        &self,
        request: AccountRequest,
    ) -> impl Future<Output = Result<Vec<Address>>> + Send;

    fn subscribe(&self) -> WalletSubscription;
}

/// Fan-out of wallet notifications to every live subscription.
#[derive(Clone, Debug, Default)]
pub struct WalletEvents {
    listeners: Arc<Mutex<Vec<mpsc::UnboundedSender<WalletEvent>>>>,
}

impl WalletEvents {
    pub fn subscribe(&self) -> WalletSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(tx),
            Err(_) => tracing::warn!("wallet listener registry poisoned"),
        }
        WalletSubscription { rx }
    }

    pub fn emit(&self, event: WalletEvent) {
        let Ok(mut listeners) = self.listeners.lock() else {
            tracing::warn!("wallet listener registry poisoned");
            return;
        };
        listeners.retain(|listener| listener.send(event.clone()).is_ok());
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .map(|listeners| listeners.iter().filter(|l| !l.is_closed()).count())
            .unwrap_or(0)
    }
}

/// Registered while alive; dropping it unregisters.
#[derive(Debug)]
pub struct WalletSubscription {
    rx: mpsc::UnboundedReceiver<WalletEvent>,
}

impl WalletSubscription {
    pub async fn recv(&mut self) -> Option<WalletEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WalletEvent> {
        self.rx.try_recv().ok()
    }
}

/// Everything a component needs to talk to the contract for the current account.
#[derive(Clone, Debug)]
pub struct Session<C> {
    pub account: Address,
    pub manager: Address,
    pub chain_id: u64,
    pub contract: C,
}

impl<C> Session<C> {
    pub fn is_manager(&self) -> bool {
        self.account == self.manager
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn wallet_events__dropped_subscription_is_pruned_on_emit() {
        // given
        let events = WalletEvents::default();
        let mut kept = events.subscribe();
        let dropped = events.subscribe();
        drop(dropped);

        // when
        events.emit(WalletEvent::ChainChanged(5));

        // then
        assert_eq!(kept.try_recv(), Some(WalletEvent::ChainChanged(5)));
        assert_eq!(events.listener_count(), 1);
    }

    #[test]
    fn wallet_events__poisoned_registry_still_returns_subscription() {
        // given
        let events = WalletEvents::default();
        let listeners = events.listeners.clone();
        let _ = std::thread::spawn(move || {
            let _guard = listeners.lock().unwrap();
            panic!("poison");
        })
        .join();

        // when
        let mut subscription = events.subscribe();
        events.emit(WalletEvent::ChainChanged(5));

        // then
        assert_eq!(subscription.try_recv(), None);
        assert_eq!(events.listener_count(), 0);
    }

    #[test]
    fn session__is_manager_compares_account() {
        let manager = Address::new([1; 20]);
        let session = Session {
            account: manager,
            manager,
            chain_id: 1,
            contract: (),
        };
        assert!(session.is_manager());
    }
}
