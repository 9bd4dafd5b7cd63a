use super::support::{
    ALICE,
    BOB,
    CAROL,
    MANAGER,
    TestWorld,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use solquiz::{
    draft::DraftEditor,
    gateway::QuizContract,
    leaderboard::Leaderboard,
    profile::{
        ProfileSession,
        ProfileWrite,
    },
    quiz_session::QuizSession,
    sandbox,
    trivia::{
        TriviaQuestion,
        build_batch,
        decode_html_entities,
    },
};

fn fill_draft(editor: &mut DraftEditor) {
    editor.open();
    let draft = editor.draft_mut();
    draft.question_mut().push_str("Capital of France?");
    draft.option_mut(0).unwrap().push_str("Paris");
    draft.option_mut(1).unwrap().push_str("Lyon");
    draft.toggle_correct(0);
}

#[tokio::test]
async fn profile__create_then_edit() {
    // given
    let mut world = TestWorld::new().await;
    let session = world.connect(ALICE).await;
    let mut profile = ProfileSession::default();
    profile.load(&session).await;
    assert!(!profile.has_profile());

    // when
    let planned = ProfileSession::default().begin_save(true, "Alice");
    let created = profile.save(Some(&session), "Alice").await;
    let planned_edit = {
        let mut probe = ProfileSession::default();
        probe.load(&session).await;
        probe.begin_save(true, "Ally")
    };
    let edited = profile.save(Some(&session), "Ally").await;

    // then
    assert_eq!(planned, Some(ProfileWrite::Create("Alice".into())));
    assert_eq!(planned_edit, Some(ProfileWrite::Edit("Ally".into())));
    assert!(created && edited);
    let remote = session.contract.leaderboard(ALICE).await.unwrap();
    assert_eq!(remote.display_name.as_deref(), Some("Ally"));
    assert_eq!(profile.display_name(), Some("Ally"));
}

#[tokio::test]
async fn draft__needs_profile_before_it_is_sent() {
    // given
    let mut world = TestWorld::new().await;
    let session = world.connect(ALICE).await;
    let mut editor = DraftEditor::default();
    fill_draft(&mut editor);

    // when
    let without_profile = editor.save(Some(&session), false).await;
    session
        .contract
        .create_user("Alice".into(), ALICE)
        .await
        .unwrap();
    let with_profile = editor.save(Some(&session), true).await;

    // then
    assert!(!without_profile);
    assert!(with_profile);
    assert!(!editor.is_open());
    assert_eq!(world.contract.quiz_count().unwrap(), 1);
    assert!(!world.contract.is_imported(0).unwrap());
}

#[tokio::test]
async fn bulk_batch__is_stored_as_imported_and_playable() {
    // given
    let world = TestWorld::new().await;
    let alice = world.with_profile(ALICE, "Alice").await;
    let questions = vec![
        TriviaQuestion {
            question: "Who wrote &quot;Hamlet&quot;?".into(),
            correct_answer: "Shakespeare".into(),
            incorrect_answers: vec!["Marlowe".into(), "Jonson".into(), "Kyd".into()],
        },
        TriviaQuestion {
            question: "2 &amp; 2?".into(),
            correct_answer: "4".into(),
            incorrect_answers: vec!["3".into(), "5".into(), "22".into()],
        },
    ];
    let batch = build_batch(questions, &mut StdRng::seed_from_u64(1));

    // when
    alice
        .contract
        .batch_create_quiz(batch, ALICE)
        .await
        .unwrap();

    // then
    assert_eq!(world.contract.quiz_count().unwrap(), 2);
    assert!(world.contract.is_imported(0).unwrap());
    assert!(world.contract.is_imported(1).unwrap());
    let bob = world.with_profile(BOB, "Bob").await;
    let mut quiz = QuizSession::with_seed(2);
    quiz.fetch(&bob).await;
    let mut decoded: Vec<String> = quiz
        .pool()
        .iter()
        .map(|q| decode_html_entities(&q.question))
        .collect();
    decoded.sort();
    assert_eq!(decoded, vec!["2 & 2?", "Who wrote \"Hamlet\"?"]);
    assert!(quiz.pool().iter().all(|q| q.options.len() == 4));
}

#[tokio::test]
async fn seed__fills_pool_with_quizzes_from_generated_authors() {
    // given
    let world = TestWorld::new().await;
    let mut rng = StdRng::seed_from_u64(42);

    // when
    sandbox::seed(&world.contract, &[ALICE, BOB, MANAGER], 5, &mut rng)
        .await
        .unwrap();

    // then
    assert_eq!(world.contract.quiz_count().unwrap(), 5);
    let carol = world.with_profile(CAROL, "Carol").await;
    let mut quiz = QuizSession::with_seed(4);
    quiz.fetch(&carol).await;
    assert_eq!(quiz.pool().len(), 5);
    assert!(
        quiz.pool()
            .iter()
            .all(|q| ![ALICE, BOB, MANAGER, CAROL].contains(&q.creator))
    );
    let mut leaderboard = Leaderboard::default();
    leaderboard.fetch(&carol).await;
    assert_eq!(leaderboard.entries().len(), 4);
}
