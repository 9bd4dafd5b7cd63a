use super::support::{
    ALICE,
    BOB,
    MANAGER,
    TestWorld,
};
use solquiz::{
    gateway::{
        QuizContract,
        Session,
    },
    leaderboard::Leaderboard,
    profile::ProfileSession,
    quiz_session::{
        AnswerBlocker,
        QuizPhase,
        QuizSession,
        RateBlocker,
    },
    sandbox::SandboxContract,
};

async fn bob_writes_quizzes(world: &TestWorld, count: usize) {
    let bob = world.with_profile(BOB, "Bob").await;
    for i in 0..count {
        bob.contract
            .create_quiz(
                format!("Question {i}?"),
                vec!["wrong".into(), "right".into(), "also wrong".into()],
                1,
                false,
                BOB,
            )
            .await
            .unwrap();
    }
}

async fn alice_with_profile(world: &mut TestWorld) -> (Session<SandboxContract>, ProfileSession) {
    let session = world.connect(ALICE).await;
    let mut profile = ProfileSession::default();
    profile.load(&session).await;
    assert!(profile.save(Some(&session), "Alice").await);
    profile.load(&session).await;
    (session, profile)
}

#[tokio::test]
async fn single_answer__correct_option_awards_points_and_ranks_player() {
    // given
    let mut world = TestWorld::new().await;
    bob_writes_quizzes(&world, 1).await;
    let (session, mut profile) = alice_with_profile(&mut world).await;
    let mut quiz = QuizSession::with_seed(3);
    quiz.set_batch_mode(false);
    quiz.fetch(&session).await;
    assert_eq!(quiz.phase(), QuizPhase::HasCandidate);

    // when
    assert!(quiz.select_option(1));
    let confirmed = quiz.submit_answer(&session, &mut profile).await;

    // then
    assert!(confirmed);
    assert_eq!(profile.points(), Some(3));
    assert_eq!(quiz.phase(), QuizPhase::NoCandidate);
    let mut leaderboard = Leaderboard::default();
    leaderboard.fetch(&session).await;
    assert_eq!(leaderboard.rank_of(ALICE), Some(1));
    assert_eq!(leaderboard.entries()[0].points, 3);
}

#[tokio::test]
async fn single_answer__wrong_option_records_answer_without_points() {
    let mut world = TestWorld::new().await;
    bob_writes_quizzes(&world, 1).await;
    let (session, mut profile) = alice_with_profile(&mut world).await;
    let mut quiz = QuizSession::with_seed(3);
    quiz.set_batch_mode(false);
    quiz.fetch(&session).await;

    quiz.select_option(0);
    assert!(quiz.submit_answer(&session, &mut profile).await);

    assert_eq!(profile.points(), Some(0));
    assert!(quiz.pool().is_empty());
}

#[tokio::test]
async fn batch__answers_go_out_in_one_call() {
    // given
    let mut world = TestWorld::new().await;
    bob_writes_quizzes(&world, 2).await;
    let (session, mut profile) = alice_with_profile(&mut world).await;
    let mut quiz = QuizSession::with_seed(9);
    quiz.fetch(&session).await;
    assert!(quiz.batch_mode());

    // when
    for _ in 0..2 {
        while quiz.batch().contains(quiz.candidate().unwrap().id) {
            assert!(quiz.skip());
        }
        quiz.select_option(1);
        assert!(quiz.add_to_batch(session.account, session.manager));
    }
    let confirmed = quiz.submit_batch(&session, &mut profile).await;

    // then
    assert!(confirmed);
    assert!(quiz.batch().is_empty());
    assert_eq!(profile.points(), Some(6));
    assert_eq!(quiz.phase(), QuizPhase::NoCandidate);
}

#[tokio::test]
async fn rating__costs_points_and_rewards_creator() {
    // given
    let mut world = TestWorld::new().await;
    bob_writes_quizzes(&world, 2).await;
    let (session, mut profile) = alice_with_profile(&mut world).await;
    let mut quiz = QuizSession::with_seed(5);
    quiz.set_batch_mode(false);
    quiz.fetch(&session).await;
    quiz.select_option(1);
    assert!(quiz.submit_answer(&session, &mut profile).await);
    assert_eq!(quiz.pool().len(), 1);

    // when
    let rated = quiz.rate(true, &session, &mut profile).await;

    // then
    assert!(rated);
    assert_eq!(profile.points(), Some(1));
    let candidate = quiz.candidate().unwrap();
    assert_eq!(candidate.positive_ratings, 1);
    assert_eq!(
        quiz.rate_blocker(ALICE, profile.points()),
        Some(RateBlocker::AlreadyRated)
    );
    let bob = session.contract.leaderboard(BOB).await.unwrap();
    assert_eq!(bob.points, Some(1));
}

#[tokio::test]
async fn rating__without_points_is_blocked_before_sending() {
    let mut world = TestWorld::new().await;
    bob_writes_quizzes(&world, 1).await;
    let (session, mut profile) = alice_with_profile(&mut world).await;
    let mut quiz = QuizSession::with_seed(5);
    quiz.fetch(&session).await;

    let rated = quiz.rate(false, &session, &mut profile).await;

    assert!(!rated);
    assert_eq!(
        quiz.rate_blocker(ALICE, profile.points()),
        Some(RateBlocker::NotEnoughPoints)
    );
    let remote = session.contract.get_quizzes(false, ALICE).await.unwrap();
    assert_eq!(remote[0].total_ratings, 0);
}

#[tokio::test]
async fn answering__blocked_for_manager_and_own_quiz() {
    // given
    let mut world = TestWorld::new().await;
    bob_writes_quizzes(&world, 1).await;
    let manager = world.connect(MANAGER).await;
    let bob = world.session_for(BOB);
    let mut manager_quiz = QuizSession::with_seed(1);
    let mut bob_quiz = QuizSession::with_seed(1);

    // when
    manager_quiz.fetch(&manager).await;
    bob_quiz.fetch(&bob).await;

    // then
    assert_eq!(
        manager_quiz.answer_blocker(MANAGER, MANAGER),
        Some(AnswerBlocker::Manager)
    );
    assert_eq!(
        bob_quiz.answer_blocker(BOB, MANAGER),
        Some(AnswerBlocker::OwnQuiz)
    );
    bob_quiz.set_batch_mode(false);
    bob_quiz.select_option(1);
    let mut profile = ProfileSession::default();
    assert!(!bob_quiz.submit_answer(&bob, &mut profile).await);
}
