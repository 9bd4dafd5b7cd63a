use crate::{
    gateway::{
        QuizContract,
        Session,
    },
    model::{
        Address,
        Quiz,
        RATE_QUIZ_POINT_COST,
        Receipt,
    },
    profile::ProfileSession,
};
use color_eyre::eyre::Result;
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use tracing::{
    info,
    warn,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QuizPhase {
    #[default]
    NoPool,
    Loading,
    HasCandidate,
    NoCandidate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerBlocker {
    AlreadyAnswered,
    OwnQuiz,
    Manager,
}

impl AnswerBlocker {
    pub fn message(self) -> &'static str {
        match self {
            AnswerBlocker::AlreadyAnswered => "You have already answered this quiz.",
            AnswerBlocker::OwnQuiz => "You cannot answer your own quiz.",
            AnswerBlocker::Manager => "You cannot answer quizzes as the manager account.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateBlocker {
    AlreadyRated,
    OwnQuiz,
    NotEnoughPoints,
}

impl RateBlocker {
    pub fn message(self) -> &'static str {
        match self {
            RateBlocker::AlreadyRated => "You have already rated this quiz.",
            RateBlocker::OwnQuiz => "You cannot rate your own quiz.",
            RateBlocker::NotEnoughPoints => "You need at least 2 points to rate a quiz.",
        }
    }
}

pub fn answer_blocker(quiz: &Quiz, account: Address, manager: Address) -> Option<AnswerBlocker> {
    if quiz.user_has_answered {
        Some(AnswerBlocker::AlreadyAnswered)
    } else if quiz.creator == account {
        Some(AnswerBlocker::OwnQuiz)
    } else if account == manager {
        Some(AnswerBlocker::Manager)
    } else {
        None
    }
}

/// An unknown balance counts as zero.
pub fn rate_blocker(quiz: &Quiz, account: Address, points: Option<i64>) -> Option<RateBlocker> {
    if quiz.user_has_rated {
        Some(RateBlocker::AlreadyRated)
    } else if quiz.creator == account {
        Some(RateBlocker::OwnQuiz)
    } else if points.unwrap_or(0) < RATE_QUIZ_POINT_COST {
        Some(RateBlocker::NotEnoughPoints)
    } else {
        None
    }
}

/// "You" for the current account, otherwise the short address.
pub fn creator_label(quiz: &Quiz, account: Option<Address>) -> String {
    if account == Some(quiz.creator) {
        "You".to_owned()
    } else {
        quiz.creator.truncated()
    }
}

/// Answers waiting for a single `batchAnswerQuiz` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchAnswers {
    quiz_ids: Vec<u64>,
    options: Vec<usize>,
}

impl BatchAnswers {
    pub fn push(&mut self, quiz_id: u64, option: usize) {
        self.quiz_ids.push(quiz_id);
        self.options.push(option);
    }

    pub fn clear(&mut self) {
        self.quiz_ids.clear();
        self.options.clear();
    }

    pub fn len(&self) -> usize {
        self.quiz_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quiz_ids.is_empty()
    }

    pub fn quiz_ids(&self) -> &[u64] {
        &self.quiz_ids
    }

    pub fn options(&self) -> &[usize] {
        &self.options
    }

    pub fn contains(&self, quiz_id: u64) -> bool {
        self.quiz_ids.contains(&quiz_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerCall {
    Single { quiz_id: u64, option: usize },
    Batch { quiz_ids: Vec<u64>, options: Vec<usize> },
}

impl AnswerCall {
    pub fn is_batch(&self) -> bool {
        matches!(self, AnswerCall::Batch { .. })
    }

    pub async fn send<C: QuizContract>(self, contract: &C, from: Address) -> Result<Receipt> {
        match self {
            AnswerCall::Single { quiz_id, option } => {
                contract.answer_quiz(quiz_id, option, from).await
            }
            AnswerCall::Batch { quiz_ids, options } => {
                contract.batch_answer_quiz(quiz_ids, options, from).await
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateCall {
    pub quiz_id: u64,
    pub positive: bool,
}

impl RateCall {
    pub async fn send<C: QuizContract>(self, contract: &C, from: Address) -> Result<Receipt> {
        contract.rate_quiz(self.quiz_id, self.positive, from).await
    }
}

/// Counters we believe a quiz has after a local rating update.
#[derive(Clone, Copy, Debug)]
struct RatingGuess {
    quiz_id: u64,
    total_ratings: u64,
    positive_ratings: u64,
}

/// Pool of unanswered quizzes, the random candidate shown to the user and
/// the answers queued for batch submission.
#[derive(Debug)]
pub struct QuizSession {
    phase: QuizPhase,
    pool: Vec<Quiz>,
    candidate: Option<usize>,
    selected_option: Option<usize>,
    batch_mode: bool,
    batch: BatchAnswers,
    sending_answer: bool,
    rating: bool,
    rating_guesses: Vec<RatingGuess>,
    rng: StdRng,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl QuizSession {
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            phase: QuizPhase::NoPool,
            pool: Vec::new(),
            candidate: None,
            selected_option: None,
            batch_mode: true,
            batch: BatchAnswers::default(),
            sending_answer: false,
            rating: false,
            rating_guesses: Vec::new(),
            rng,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn pool(&self) -> &[Quiz] {
        &self.pool
    }

    pub fn candidate(&self) -> Option<&Quiz> {
        self.candidate.and_then(|idx| self.pool.get(idx))
    }

    pub fn selected_option(&self) -> Option<usize> {
        self.selected_option
    }

    pub fn batch_mode(&self) -> bool {
        self.batch_mode
    }

    pub fn batch(&self) -> &BatchAnswers {
        &self.batch
    }

    pub fn is_sending_answer(&self) -> bool {
        self.sending_answer
    }

    pub fn is_rating(&self) -> bool {
        self.rating
    }

    /// Back to `NoPool`; queued answers are dropped.
    pub fn reset(&mut self) {
        self.phase = QuizPhase::NoPool;
        self.pool.clear();
        self.candidate = None;
        self.selected_option = None;
        self.batch.clear();
        self.sending_answer = false;
        self.rating = false;
        self.rating_guesses.clear();
    }

    pub fn begin_fetch(&mut self) {
        self.phase = QuizPhase::Loading;
        self.candidate = None;
        self.selected_option = None;
    }

    /// Rebuilds the pool from a `getQuizzes` result and draws a candidate.
    /// A failed fetch keeps the previous pool.
    pub fn finish_fetch(&mut self, result: Result<Vec<Quiz>>) {
        let fetched = match result {
            Ok(quizzes) => {
                self.reconcile_ratings(&quizzes);
                let total = quizzes.len();
                self.pool = quizzes
                    .into_iter()
                    .filter(|quiz| !quiz.user_has_answered)
                    .collect();
                info!(total, eligible = self.pool.len(), "quiz pool fetched");
                true
            }
            Err(err) => {
                warn!(?err, "fetching quizzes failed");
                false
            }
        };
        if !self.pool.is_empty() {
            self.draw_candidate();
            self.phase = QuizPhase::HasCandidate;
        } else {
            self.candidate = None;
            self.phase = if fetched {
                QuizPhase::NoCandidate
            } else {
                QuizPhase::NoPool
            };
        }
    }

    pub async fn fetch<C: QuizContract>(&mut self, session: &Session<C>) {
        self.begin_fetch();
        let result = session.contract.get_quizzes(true, session.account).await;
        self.finish_fetch(result);
    }

    fn draw_candidate(&mut self) {
        self.selected_option = None;
        self.candidate = if self.pool.is_empty() {
            None
        } else {
            Some(self.rng.random_range(0..self.pool.len()))
        };
    }

    fn reconcile_ratings(&mut self, quizzes: &[Quiz]) {
        for guess in self.rating_guesses.drain(..) {
            let Some(remote) = quizzes.iter().find(|q| q.id == guess.quiz_id) else {
                continue;
            };
            if remote.total_ratings != guess.total_ratings
                || remote.positive_ratings != guess.positive_ratings
            {
                warn!(
                    quiz_id = guess.quiz_id,
                    local_total = guess.total_ratings,
                    local_positive = guess.positive_ratings,
                    remote_total = remote.total_ratings,
                    remote_positive = remote.positive_ratings,
                    "rating counters drifted from contract"
                );
            }
        }
    }

    pub fn can_skip(&self) -> bool {
        self.pool.len() >= 2 && !self.sending_answer
    }

    pub fn skip(&mut self) -> bool {
        if !self.can_skip() {
            return false;
        }
        self.draw_candidate();
        true
    }

    pub fn select_option(&mut self, option: usize) -> bool {
        match self.candidate() {
            Some(quiz) if option < quiz.options.len() => {
                self.selected_option = Some(option);
                true
            }
            _ => false,
        }
    }

    pub fn set_batch_mode(&mut self, batch_mode: bool) {
        self.batch_mode = batch_mode;
    }

    pub fn answer_blocker(&self, account: Address, manager: Address) -> Option<AnswerBlocker> {
        self.candidate()
            .and_then(|quiz| answer_blocker(quiz, account, manager))
    }

    pub fn rate_blocker(&self, account: Address, points: Option<i64>) -> Option<RateBlocker> {
        self.candidate()
            .and_then(|quiz| rate_blocker(quiz, account, points))
    }

    /// Candidate shown, option picked, nothing in flight, answering allowed.
    pub fn can_answer(&self, account: Address, manager: Address) -> bool {
        self.phase == QuizPhase::HasCandidate
            && self.candidate().is_some()
            && self.selected_option.is_some()
            && !self.sending_answer
            && self.answer_blocker(account, manager).is_none()
    }

    /// Queues the candidate's answer and draws the next candidate. The quiz
    /// stays in the pool, so it can come up again before the batch is sent.
    pub fn add_to_batch(&mut self, account: Address, manager: Address) -> bool {
        if !self.batch_mode || !self.can_answer(account, manager) {
            return false;
        }
        let (Some(quiz), Some(option)) = (self.candidate(), self.selected_option) else {
            return false;
        };
        let quiz_id = quiz.id;
        self.batch.push(quiz_id, option);
        info!(quiz_id, option, queued = self.batch.len(), "answer added to batch");
        self.draw_candidate();
        true
    }

    pub fn begin_answer(&mut self, account: Address, manager: Address) -> Option<AnswerCall> {
        if self.batch_mode || !self.can_answer(account, manager) {
            return None;
        }
        let quiz_id = self.candidate()?.id;
        let option = self.selected_option?;
        self.sending_answer = true;
        Some(AnswerCall::Single { quiz_id, option })
    }

    pub fn can_submit_batch(&self) -> bool {
        !self.batch.is_empty() && !self.sending_answer
    }

    pub fn begin_batch_submit(&mut self) -> Option<AnswerCall> {
        if !self.can_submit_batch() {
            return None;
        }
        self.sending_answer = true;
        Some(AnswerCall::Batch {
            quiz_ids: self.batch.quiz_ids().to_vec(),
            options: self.batch.options().to_vec(),
        })
    }

    /// Applies an answer receipt. Returns whether the pool should be
    /// re-fetched; the session is already in `Loading` when it should.
    pub fn finish_answer(
        &mut self,
        call: &AnswerCall,
        result: Result<Receipt>,
        profile: &mut ProfileSession,
    ) -> bool {
        self.sending_answer = false;
        if call.is_batch() {
            self.batch.clear();
        }
        match result {
            Ok(receipt) => {
                let awarded = receipt.points_awarded();
                info!(?call, ?awarded, "answer confirmed");
                profile.award(awarded);
                self.begin_fetch();
                true
            }
            Err(err) => {
                warn!(?err, ?call, "submitting answer failed");
                false
            }
        }
    }

    /// Sends the candidate's answer (single mode) and re-fetches the pool.
    pub async fn submit_answer<C: QuizContract>(
        &mut self,
        session: &Session<C>,
        profile: &mut ProfileSession,
    ) -> bool {
        let Some(call) = self.begin_answer(session.account, session.manager) else {
            return false;
        };
        self.send_answer(call, session, profile).await
    }

    pub async fn submit_batch<C: QuizContract>(
        &mut self,
        session: &Session<C>,
        profile: &mut ProfileSession,
    ) -> bool {
        let Some(call) = self.begin_batch_submit() else {
            return false;
        };
        self.send_answer(call, session, profile).await
    }

    async fn send_answer<C: QuizContract>(
        &mut self,
        call: AnswerCall,
        session: &Session<C>,
        profile: &mut ProfileSession,
    ) -> bool {
        let result = call
            .clone()
            .send(&session.contract, session.account)
            .await;
        let confirmed = result.is_ok();
        if self.finish_answer(&call, result, profile) {
            let quizzes = session.contract.get_quizzes(true, session.account).await;
            self.finish_fetch(quizzes);
        }
        confirmed
    }

    pub fn begin_rate(
        &mut self,
        positive: bool,
        account: Address,
        points: Option<i64>,
    ) -> Option<RateCall> {
        if self.rating || self.rate_blocker(account, points).is_some() {
            return None;
        }
        let quiz_id = self.candidate()?.id;
        self.rating = true;
        Some(RateCall { quiz_id, positive })
    }

    /// On success bumps the counters of the rated quiz in place and charges
    /// the rating cost; no re-fetch.
    pub fn finish_rate(
        &mut self,
        call: RateCall,
        result: Result<Receipt>,
        profile: &mut ProfileSession,
    ) -> bool {
        self.rating = false;
        if let Err(err) = result {
            warn!(?err, ?call, "rating quiz failed");
            return false;
        }
        if let Some(quiz) = self.pool.iter_mut().find(|q| q.id == call.quiz_id) {
            quiz.user_has_rated = true;
            quiz.total_ratings += 1;
            if call.positive {
                quiz.positive_ratings += 1;
            }
            self.rating_guesses.push(RatingGuess {
                quiz_id: quiz.id,
                total_ratings: quiz.total_ratings,
                positive_ratings: quiz.positive_ratings,
            });
        }
        profile.spend(RATE_QUIZ_POINT_COST);
        info!(?call, "quiz rated");
        true
    }

    pub async fn rate<C: QuizContract>(
        &mut self,
        positive: bool,
        session: &Session<C>,
        profile: &mut ProfileSession,
    ) -> bool {
        let Some(call) = self.begin_rate(positive, session.account, profile.points()) else {
            return false;
        };
        let result = call.send(&session.contract, session.account).await;
        self.finish_rate(call, result, profile)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        ALICE,
        BOB,
        CAROL,
        Call,
        FakeContract,
        MANAGER,
        quiz,
        session,
        user,
    };
    use color_eyre::eyre::eyre;
    use proptest::prelude::*;

    fn loaded(quizzes: Vec<Quiz>) -> QuizSession {
        let mut quiz_session = QuizSession::with_seed(42);
        quiz_session.begin_fetch();
        quiz_session.finish_fetch(Ok(quizzes));
        quiz_session
    }

    fn profile_with(points: i64) -> ProfileSession {
        let mut profile = ProfileSession::default();
        profile.begin_load(ALICE);
        profile.finish_load(ALICE, Ok(user("Alice", points)));
        profile
    }

    #[tokio::test]
    async fn fetch__filters_answered_quizzes_and_draws_candidate() {
        // given
        let contract = FakeContract::new(MANAGER);
        let mut answered = quiz(1, BOB);
        answered.user_has_answered = true;
        contract.set_quizzes(vec![answered, quiz(2, BOB)]);
        let mut quiz_session = QuizSession::with_seed(1);

        // when
        quiz_session.fetch(&session(ALICE, contract.clone())).await;

        // then
        assert_eq!(quiz_session.phase(), QuizPhase::HasCandidate);
        assert_eq!(quiz_session.pool().len(), 1);
        assert_eq!(quiz_session.candidate().map(|q| q.id), Some(2));
        assert_eq!(
            contract.calls(),
            vec![Call::GetQuizzes {
                with_user_status: true
            }]
        );
    }

    #[test]
    fn finish_fetch__empty_pool_is_no_candidate() {
        let quiz_session = loaded(vec![]);
        assert_eq!(quiz_session.phase(), QuizPhase::NoCandidate);
        assert!(quiz_session.candidate().is_none());
    }

    #[test]
    fn finish_fetch__failure_without_pool_is_no_pool() {
        let mut quiz_session = QuizSession::with_seed(1);
        quiz_session.begin_fetch();

        quiz_session.finish_fetch(Err(eyre!("rpc down")));

        assert_eq!(quiz_session.phase(), QuizPhase::NoPool);
    }

    #[test]
    fn finish_fetch__failure_keeps_previous_pool() {
        // given
        let mut quiz_session = loaded(vec![quiz(1, BOB), quiz(2, BOB)]);

        // when
        quiz_session.begin_fetch();
        quiz_session.finish_fetch(Err(eyre!("rpc down")));

        // then
        assert_eq!(quiz_session.phase(), QuizPhase::HasCandidate);
        assert_eq!(quiz_session.pool().len(), 2);
    }

    #[test]
    fn can_skip__needs_two_quizzes_and_no_answer_in_flight() {
        // given
        let single = loaded(vec![quiz(1, BOB)]);
        let mut pair = loaded(vec![quiz(1, BOB), quiz(2, BOB)]);

        // then
        assert!(!single.can_skip());
        assert!(pair.can_skip());

        // when
        pair.set_batch_mode(false);
        pair.select_option(0);
        let call = pair.begin_answer(ALICE, MANAGER);

        // then
        assert!(call.is_some());
        assert!(!pair.can_skip());
        assert!(!pair.skip());
    }

    #[test]
    fn answer_blocker__own_quiz_and_manager() {
        let quiz_session = loaded(vec![quiz(1, ALICE)]);
        assert_eq!(
            quiz_session.answer_blocker(ALICE, MANAGER),
            Some(AnswerBlocker::OwnQuiz)
        );

        let quiz_session = loaded(vec![quiz(1, BOB)]);
        assert_eq!(
            quiz_session.answer_blocker(MANAGER, MANAGER),
            Some(AnswerBlocker::Manager)
        );
        assert_eq!(quiz_session.answer_blocker(ALICE, MANAGER), None);
    }

    #[test]
    fn rate_blocker__own_quiz_regardless_of_points() {
        let quiz_session = loaded(vec![quiz(1, ALICE)]);
        assert_eq!(
            quiz_session.rate_blocker(ALICE, Some(100)),
            Some(RateBlocker::OwnQuiz)
        );
    }

    #[test]
    fn rate_blocker__needs_two_points() {
        let quiz_session = loaded(vec![quiz(1, BOB)]);
        assert_eq!(
            quiz_session.rate_blocker(ALICE, Some(1)),
            Some(RateBlocker::NotEnoughPoints)
        );
        assert_eq!(
            quiz_session.rate_blocker(ALICE, None),
            Some(RateBlocker::NotEnoughPoints)
        );
        assert_eq!(quiz_session.rate_blocker(ALICE, Some(2)), None);
    }

    #[tokio::test]
    async fn submit_answer__adds_awarded_points_and_refetches() {
        // given
        let contract = FakeContract::new(MANAGER);
        contract.set_quizzes(vec![quiz(7, BOB)]);
        contract.award_points(Some(3));
        let session = session(ALICE, contract.clone());
        let mut profile = profile_with(5);
        let mut quiz_session = QuizSession::with_seed(3);
        quiz_session.set_batch_mode(false);
        quiz_session.fetch(&session).await;
        quiz_session.select_option(0);

        // when
        let confirmed = quiz_session.submit_answer(&session, &mut profile).await;

        // then
        assert!(confirmed);
        assert_eq!(profile.points(), Some(8));
        assert!(quiz_session.pool().iter().all(|q| q.id != 7));
        assert_eq!(quiz_session.phase(), QuizPhase::NoCandidate);
        assert_eq!(
            contract.calls(),
            vec![
                Call::GetQuizzes {
                    with_user_status: true
                },
                Call::AnswerQuiz {
                    quiz_id: 7,
                    option: 0
                },
                Call::GetQuizzes {
                    with_user_status: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn submit_answer__without_award_leaves_points() {
        let contract = FakeContract::new(MANAGER);
        contract.set_quizzes(vec![quiz(7, BOB)]);
        contract.award_points(None);
        let session = session(ALICE, contract);
        let mut profile = profile_with(5);
        let mut quiz_session = QuizSession::with_seed(3);
        quiz_session.set_batch_mode(false);
        quiz_session.fetch(&session).await;
        quiz_session.select_option(1);

        quiz_session.submit_answer(&session, &mut profile).await;

        assert_eq!(profile.points(), Some(5));
    }

    #[tokio::test]
    async fn submit_answer__failure_keeps_candidate_and_points() {
        // given
        let contract = FakeContract::new(MANAGER);
        contract.set_quizzes(vec![quiz(7, BOB)]);
        contract.fail_writes(true);
        let session = session(ALICE, contract);
        let mut profile = profile_with(5);
        let mut quiz_session = QuizSession::with_seed(3);
        quiz_session.set_batch_mode(false);
        quiz_session.fetch(&session).await;
        quiz_session.select_option(1);

        // when
        let confirmed = quiz_session.submit_answer(&session, &mut profile).await;

        // then
        assert!(!confirmed);
        assert!(!quiz_session.is_sending_answer());
        assert_eq!(quiz_session.candidate().map(|q| q.id), Some(7));
        assert_eq!(profile.points(), Some(5));
    }

    #[test]
    fn add_to_batch__same_quiz_can_be_drawn_again() {
        // given
        let mut quiz_session = loaded(vec![quiz(4, BOB)]);
        quiz_session.select_option(2);

        // when
        let added = quiz_session.add_to_batch(ALICE, MANAGER);

        // then
        assert!(added);
        assert_eq!(quiz_session.batch().quiz_ids(), &[4]);
        assert_eq!(quiz_session.batch().options(), &[2]);
        assert_eq!(quiz_session.candidate().map(|q| q.id), Some(4));
        assert_eq!(quiz_session.selected_option(), None);
    }

    #[test]
    fn add_to_batch__requires_selected_option() {
        let mut quiz_session = loaded(vec![quiz(4, BOB)]);
        assert!(!quiz_session.add_to_batch(ALICE, MANAGER));
        assert!(quiz_session.batch().is_empty());
    }

    #[tokio::test]
    async fn submit_batch__sends_parallel_arrays_and_clears() {
        // given
        let contract = FakeContract::new(MANAGER);
        contract.set_quizzes(vec![quiz(1, BOB), quiz(2, CAROL)]);
        contract.award_points(Some(3));
        let session = session(ALICE, contract.clone());
        let mut profile = profile_with(0);
        let mut quiz_session = QuizSession::with_seed(9);
        quiz_session.fetch(&session).await;
        quiz_session.select_option(1);
        quiz_session.add_to_batch(ALICE, MANAGER);
        quiz_session.select_option(0);
        quiz_session.add_to_batch(ALICE, MANAGER);
        let expected_ids = quiz_session.batch().quiz_ids().to_vec();

        // when
        let confirmed = quiz_session.submit_batch(&session, &mut profile).await;

        // then
        assert!(confirmed);
        assert!(quiz_session.batch().is_empty());
        assert_eq!(profile.points(), Some(6));
        assert!(contract.writes().contains(&Call::BatchAnswerQuiz {
            quiz_ids: expected_ids,
            options: vec![1, 0],
        }));
    }

    #[tokio::test]
    async fn submit_batch__failure_still_clears() {
        // given
        let contract = FakeContract::new(MANAGER);
        contract.set_quizzes(vec![quiz(1, BOB)]);
        contract.fail_writes(true);
        let session = session(ALICE, contract);
        let mut profile = profile_with(0);
        let mut quiz_session = QuizSession::with_seed(9);
        quiz_session.fetch(&session).await;
        quiz_session.select_option(1);
        quiz_session.add_to_batch(ALICE, MANAGER);

        // when
        let confirmed = quiz_session.submit_batch(&session, &mut profile).await;

        // then
        assert!(!confirmed);
        assert!(quiz_session.batch().is_empty());
        assert!(!quiz_session.is_sending_answer());
    }

    #[tokio::test]
    async fn rate__updates_counters_and_charges_without_refetch() {
        // given
        let contract = FakeContract::new(MANAGER);
        let mut rated = quiz(3, BOB);
        rated.total_ratings = 4;
        rated.positive_ratings = 1;
        contract.set_quizzes(vec![rated]);
        let session = session(ALICE, contract.clone());
        let mut profile = profile_with(5);
        let mut quiz_session = QuizSession::with_seed(9);
        quiz_session.fetch(&session).await;

        // when
        let rated = quiz_session.rate(true, &session, &mut profile).await;

        // then
        assert!(rated);
        let quiz = quiz_session.candidate().unwrap();
        assert_eq!((quiz.positive_ratings, quiz.total_ratings), (2, 5));
        assert!(quiz.user_has_rated);
        assert_eq!(profile.points(), Some(3));
        assert_eq!(
            contract.calls().last(),
            Some(&Call::RateQuiz {
                quiz_id: 3,
                positive: true
            })
        );
        assert_eq!(
            quiz_session.rate_blocker(ALICE, profile.points()),
            Some(RateBlocker::AlreadyRated)
        );
    }

    #[tokio::test]
    async fn rate__failure_leaves_counters() {
        let contract = FakeContract::new(MANAGER);
        contract.set_quizzes(vec![quiz(3, BOB)]);
        contract.fail_writes(true);
        let session = session(ALICE, contract);
        let mut profile = profile_with(5);
        let mut quiz_session = QuizSession::with_seed(9);
        quiz_session.fetch(&session).await;

        let rated = quiz_session.rate(false, &session, &mut profile).await;

        assert!(!rated);
        assert_eq!(quiz_session.candidate().unwrap().total_ratings, 0);
        assert_eq!(profile.points(), Some(5));
        assert!(!quiz_session.is_rating());
    }

    #[test]
    fn creator_label__marks_own_quiz() {
        assert_eq!(creator_label(&quiz(1, ALICE), Some(ALICE)), "You");
        assert_eq!(creator_label(&quiz(1, BOB), Some(ALICE)), BOB.truncated());
    }

    #[derive(Clone, Debug)]
    enum Op {
        Select(usize),
        Add,
        Skip,
        SubmitOk,
        SubmitErr,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..4).prop_map(Op::Select),
            Just(Op::Add),
            Just(Op::Skip),
            Just(Op::SubmitOk),
            Just(Op::SubmitErr),
        ]
    }

    proptest! {
        #[test]
        fn batch_answers__stay_parallel(ops in proptest::collection::vec(op(), 0..40)) {
            let pool = (0..5).map(|id| quiz(id, BOB)).collect();
            let mut quiz_session = loaded(pool);
            let mut profile = profile_with(0);
            for op in ops {
                match op {
                    Op::Select(idx) => {
                        quiz_session.select_option(idx);
                    }
                    Op::Add => {
                        quiz_session.add_to_batch(ALICE, MANAGER);
                    }
                    Op::Skip => {
                        quiz_session.skip();
                    }
                    Op::SubmitOk | Op::SubmitErr => {
                        if let Some(call) = quiz_session.begin_batch_submit() {
                            let result = if matches!(op, Op::SubmitOk) {
                                Ok(Receipt::default())
                            } else {
                                Err(eyre!("reverted"))
                            };
                            quiz_session.finish_answer(&call, result, &mut profile);
                            prop_assert!(quiz_session.batch().is_empty());
                            quiz_session.finish_fetch(Ok((0..5).map(|id| quiz(id, BOB)).collect()));
                        }
                    }
                }
                prop_assert_eq!(
                    quiz_session.batch().quiz_ids().len(),
                    quiz_session.batch().options().len()
                );
            }
        }

        #[test]
        fn rating__never_exceeds_total(
            positive_start in 0u64..10,
            extra in 0u64..10,
            votes in proptest::collection::vec(any::<bool>(), 1..10),
        ) {
            let mut quiz_session = QuizSession::with_seed(5);
            let mut profile = profile_with(100);
            for (idx, positive) in votes.into_iter().enumerate() {
                let mut fresh = quiz(idx as u64, BOB);
                fresh.positive_ratings = positive_start;
                fresh.total_ratings = positive_start + extra;
                quiz_session.begin_fetch();
                quiz_session.finish_fetch(Ok(vec![fresh]));
                let call = quiz_session
                    .begin_rate(positive, ALICE, profile.points())
                    .unwrap();
                quiz_session.finish_rate(call, Ok(Receipt::default()), &mut profile);
                let quiz = quiz_session.candidate().unwrap();
                prop_assert!(quiz.positive_ratings <= quiz.total_ratings);
            }
        }
    }
}
