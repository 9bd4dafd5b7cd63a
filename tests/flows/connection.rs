use super::support::{
    ALICE,
    BOB,
    MANAGER,
    TestWorld,
};
use solquiz::{
    connection::{
        ConnectionState,
        ConnectionTracker,
        NotReadyReason,
    },
    deployment::{
        ArtifactStore,
        SANDBOX_CHAIN_ID,
        SEPOLIA_CHAIN_ID,
    },
    sandbox::SandboxDirectory,
    wallets::LocalWallet,
};

#[tokio::test]
async fn startup__reports_no_account_until_connected() {
    // given
    let mut world = TestWorld::new().await;

    // when
    world.tracker.initialize().await.unwrap();

    // then
    assert_eq!(
        world.tracker.state(),
        ConnectionState::NotReady(NotReadyReason::NoAccount)
    );
    let session = world.connect(ALICE).await;
    assert_eq!(
        world.tracker.state(),
        ConnectionState::Ready {
            account: ALICE,
            manager: MANAGER,
            chain_id: SANDBOX_CHAIN_ID,
        }
    );
    assert!(!session.is_manager());
}

#[tokio::test]
async fn artifact__records_sandbox_address_only() {
    let world = TestWorld::new().await;

    let artifact = ArtifactStore::new(&world.artifact_path)
        .load()
        .unwrap()
        .unwrap();

    assert_eq!(
        artifact.address_for(SANDBOX_CHAIN_ID).unwrap(),
        Some(world.contract.address())
    );
    assert_eq!(artifact.address_for(SEPOLIA_CHAIN_ID).unwrap(), None);
}

#[tokio::test]
async fn network_switch__wrong_network_then_back_restores_session() {
    // given
    let mut world = TestWorld::new().await;
    world.connect(ALICE).await;
    let mut events = world.tracker.subscribe().unwrap();

    // when
    world.wallet.switch_chain(SEPOLIA_CHAIN_ID).unwrap();
    let event = events.recv().await.unwrap();
    world.tracker.handle_wallet_event(event).await.unwrap();

    // then
    assert_eq!(
        world.tracker.state().not_ready_reason(),
        Some(NotReadyReason::WrongNetwork)
    );
    assert!(world.tracker.session().is_none());

    // when
    world.wallet.switch_chain(SANDBOX_CHAIN_ID).unwrap();
    let event = events.recv().await.unwrap();
    world.tracker.handle_wallet_event(event).await.unwrap();

    // then
    let session = world.tracker.session().unwrap();
    assert_eq!(session.account, ALICE);
    assert_eq!(session.chain_id, SANDBOX_CHAIN_ID);
}

#[tokio::test]
async fn account_change__moves_session_to_new_account() {
    // given
    let mut world = TestWorld::new().await;
    world.connect(ALICE).await;
    let mut events = world.tracker.subscribe().unwrap();

    // when
    let next = world.wallet.cycle_account().unwrap();
    let event = events.recv().await.unwrap();
    world.tracker.handle_wallet_event(event).await.unwrap();

    // then
    assert_eq!(next, Some(BOB));
    assert_eq!(world.tracker.session().unwrap().account, BOB);
}

#[tokio::test]
async fn disconnect__returns_to_no_account() {
    let mut world = TestWorld::new().await;
    world.connect(ALICE).await;

    world.tracker.disconnect();

    assert_eq!(
        world.tracker.state().not_ready_reason(),
        Some(NotReadyReason::NoAccount)
    );
    assert!(world.tracker.session().is_none());
}

#[tokio::test]
async fn initialize__missing_wallet_or_artifact_is_reported() {
    // given
    let mut no_wallet: ConnectionTracker<LocalWallet, SandboxDirectory> =
        ConnectionTracker::new(None, SandboxDirectory::default(), None);
    let mut no_artifact = ConnectionTracker::new(
        Some(LocalWallet::development_with(vec![ALICE], SANDBOX_CHAIN_ID)),
        SandboxDirectory::default(),
        None,
    );

    // when
    no_wallet.initialize().await.unwrap();
    no_artifact.initialize().await.unwrap();

    // then
    assert_eq!(
        no_wallet.state().not_ready_reason(),
        Some(NotReadyReason::NoWallet)
    );
    assert_eq!(
        no_artifact.state().not_ready_reason(),
        Some(NotReadyReason::NoArtifact)
    );
    assert_eq!(NotReadyReason::NoWallet.message(), "No wallet found");
}
