use rand::{
    SeedableRng,
    rngs::StdRng,
};
use solquiz::{
    connection::ConnectionTracker,
    deployment::{
        ArtifactStore,
        SANDBOX_CHAIN_ID,
    },
    gateway::{
        AccountRequest,
        QuizContract,
        Session,
    },
    model::Address,
    sandbox::{
        SandboxContract,
        SandboxDirectory,
    },
    wallets::LocalWallet,
};
use std::path::PathBuf;

pub use solquiz::test_helpers::{
    ALICE,
    BOB,
    CAROL,
    MANAGER,
};

pub type Tracker = ConnectionTracker<LocalWallet, SandboxDirectory>;

/// Sandbox deployment recorded in a throwaway artifact, with a development
/// wallet holding Alice, Bob and the manager.
pub struct TestWorld {
    pub contract: SandboxContract,
    pub wallet: LocalWallet,
    pub tracker: Tracker,
    pub artifact_path: PathBuf,
}

impl TestWorld {
    pub async fn new() -> Self {
        let directory = SandboxDirectory::default();
        let mut rng = StdRng::seed_from_u64(7);
        let contract = directory
            .deploy(SANDBOX_CHAIN_ID, MANAGER, &mut rng)
            .unwrap();
        let artifact_path = temp_artifact_path();
        let artifact = ArtifactStore::new(&artifact_path)
            .record_deployment(SANDBOX_CHAIN_ID, contract.address())
            .unwrap();
        let wallet =
            LocalWallet::development_with(vec![ALICE, BOB, MANAGER], SANDBOX_CHAIN_ID);
        let tracker = ConnectionTracker::new(Some(wallet.clone()), directory, Some(artifact));
        Self {
            contract,
            wallet,
            tracker,
            artifact_path,
        }
    }

    pub async fn connect(&mut self, account: Address) -> Session<SandboxContract> {
        self.tracker.initialize().await.unwrap();
        self.tracker
            .connect(AccountRequest {
                account: Some(account),
                password: None,
            })
            .await
            .unwrap();
        self.tracker.session().unwrap()
    }

    /// Session for another player on the same contract, bypassing the wallet.
    pub fn session_for(&self, account: Address) -> Session<SandboxContract> {
        Session {
            account,
            manager: MANAGER,
            chain_id: SANDBOX_CHAIN_ID,
            contract: self.contract.clone(),
        }
    }

    pub async fn with_profile(&self, account: Address, name: &str) -> Session<SandboxContract> {
        self.contract
            .create_user(name.to_owned(), account)
            .await
            .unwrap();
        self.session_for(account)
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.artifact_path);
    }
}

fn temp_artifact_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("solquiz-{}-{}", std::process::id(), rand::random::<u64>()))
        .join("SolQuiz.json")
}
