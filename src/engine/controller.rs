// src/engine/controller.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    clients::Collaborators,
    config::FullscreenPolicy,
    engine::{
        admission::{self, Admission, AdmissionContext},
        integrity::{IntegrityMonitor, IntegritySignal, Verdict},
        scoring::{self, MarkingScheme},
        submission::{self, SubmissionPipeline},
        timer::{Clock, Countdown, TimerEvent},
    },
    error::{CollaboratorError, SessionError},
    models::{
        answer::{Answer, AnswerStore},
        question::{PublicQuestion, Question},
        session::{Phase, RejectReason, SessionRequest, SessionView},
        submission::{ScoreResult, SubmissionPayload, SubmitTrigger},
        test::{Test, TestSummary},
    },
};

/// The single mutable aggregate of a session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    pub cursor: usize,
    pub answers: AnswerStore,
    pub timer: Countdown,
    pub integrity: IntegrityMonitor,
    pub started_at: Option<DateTime<Utc>>,
    /// Set once, when the submission payload is assembled.
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: Phase::Loading,
            cursor: 0,
            answers: AnswerStore::default(),
            timer: Countdown::idle(),
            integrity: IntegrityMonitor::new(),
            started_at: None,
            ended_at: None,
        }
    }
}

/// What happened when the attempt began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttemptStarted {
    /// The host should ask for fullscreen (anti-cheat tests).
    pub request_fullscreen: bool,
    pub remaining_seconds: Option<u64>,
}

/// Result of asking the session to finish.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The result is recorded; the session is over.
    Completed { result: ScoreResult },
    /// Manual submit (or exit) that needs the student to confirm first.
    AwaitingConfirmation { unanswered: usize },
    /// A submission is in flight or already done; nothing was sent.
    Ignored,
}

/// Drives one student through one test.
///
/// All mutation goes through the methods below; every method checks the
/// current phase first, so illegal transitions surface as
/// `SessionError::InvalidTransition` instead of corrupting state.
pub struct SessionController {
    id: Uuid,
    request: SessionRequest,
    test: Option<Test>,
    questions: Vec<Question>,
    state: SessionState,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    fullscreen_policy: FullscreenPolicy,
    pipeline: SubmissionPipeline,
}

impl SessionController {
    pub fn new(
        request: SessionRequest,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        fullscreen_policy: FullscreenPolicy,
    ) -> Self {
        let pipeline = SubmissionPipeline::new(collaborators.results.clone());
        Self {
            id: Uuid::new_v4(),
            request,
            test: None,
            questions: Vec::new(),
            state: SessionState::new(),
            collaborators,
            clock,
            fullscreen_policy,
            pipeline,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> &Phase {
        &self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn remaining_seconds(&self) -> Option<u64> {
        self.state.timer.remaining()
    }

    pub fn timer_running(&self) -> bool {
        self.state.timer.is_running()
    }

    /// The payload once assembled (also while a failed write awaits retry).
    pub fn payload(&self) -> Option<&SubmissionPayload> {
        self.pipeline.payload()
    }

    /// The graded result, once the store has accepted it.
    pub fn result(&self) -> Option<&ScoreResult> {
        if !self.pipeline.is_delivered() {
            return None;
        }
        self.pipeline.payload().map(|p| &p.score)
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            phase: self.state.phase.to_string(),
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::info!(
            session_id = %self.id,
            from = %self.state.phase,
            to = %phase,
            "Session phase changed"
        );
        self.state.phase = phase;
    }

    fn loaded_test(&self) -> Result<&Test, SessionError> {
        self.test
            .as_ref()
            .ok_or_else(|| SessionError::InvalidContent("test is not loaded".to_string()))
    }

    fn admission_context(&self) -> Result<AdmissionContext<'_>, SessionError> {
        Ok(AdmissionContext {
            test: self.loaded_test()?,
            question_count: self.questions.len(),
            prior_attempt: false,
            student_class: &self.request.student_class,
            premium_override: self.request.premium,
        })
    }

    /// Fetches test, questions and attempt history, then applies the
    /// terminal eligibility checks.
    pub async fn load(&mut self) -> Result<&Phase, SessionError> {
        if self.state.phase != Phase::Loading {
            return Err(self.invalid("load"));
        }
        let content = self.collaborators.content.clone();
        let test_id = self.request.test_id.clone();

        let Some(test) = content.get_test(&test_id).await? else {
            self.set_phase(Phase::Rejected {
                reason: RejectReason::TestNotFound,
            });
            return Ok(&self.state.phase);
        };
        test.validate()
            .map_err(|e| SessionError::InvalidContent(format!("test {}: {}", test.id, e)))?;
        let questions = content.get_questions(&test_id).await?;
        let prior_attempt = content
            .has_prior_attempt(&self.request.student_id, &test_id)
            .await?;

        for q in &questions {
            q.check()?;
        }

        let ctx = AdmissionContext {
            test: &test,
            question_count: questions.len(),
            prior_attempt,
            student_class: &self.request.student_class,
            premium_override: self.request.premium,
        };
        let eligibility = admission::check_eligibility(&ctx);

        self.state.answers = AnswerStore::new(questions.len());
        self.test = Some(test);
        self.questions = questions;

        match eligibility {
            Ok(()) => self.set_phase(Phase::AdmissionPending),
            Err(reason) => {
                tracing::warn!(
                    session_id = %self.id,
                    student_id = %self.request.student_id,
                    test_id = %test_id,
                    ?reason,
                    "Admission rejected"
                );
                self.set_phase(Phase::Rejected { reason });
            }
        }
        Ok(&self.state.phase)
    }

    /// Runs the admission gate and moves to the first preliminary screen.
    /// An insufficient balance is reported, not raised: the session waits in
    /// `PaymentRequired` until the student tops up and pays.
    pub async fn admit(&mut self) -> Result<Admission, SessionError> {
        if self.state.phase != Phase::AdmissionPending {
            return Err(self.invalid("admit"));
        }
        let test = self.loaded_test()?;
        let balance = match admission::payment_due(test, self.request.premium) {
            Some(_) => Some(
                self.collaborators
                    .ledger
                    .get_balance(&self.request.student_id)
                    .await?,
            ),
            None => None,
        };

        let decision = admission::evaluate(&self.admission_context()?, balance);
        match decision {
            Admission::Reject(reason) => self.set_phase(Phase::Rejected { reason }),
            Admission::RequirePayment { cost } => self.set_phase(Phase::PaymentRequired { cost }),
            Admission::InsufficientBalance { cost, balance } => {
                tracing::warn!(
                    session_id = %self.id,
                    cost,
                    balance,
                    "Insufficient balance for paid test"
                );
                self.set_phase(Phase::PaymentRequired { cost });
            }
            Admission::RequireInstructions => self.set_phase(Phase::Instructions),
            Admission::Proceed => {
                self.begin_attempt()?;
            }
        }
        Ok(decision)
    }

    /// `load` followed by `admit` when the student is eligible.
    pub async fn open(&mut self) -> Result<&Phase, SessionError> {
        self.load().await?;
        if self.state.phase == Phase::AdmissionPending {
            self.admit().await?;
        }
        Ok(&self.state.phase)
    }

    /// Charges the coin cost. Irreversible for this session.
    /// Returns the balance left after the deduction.
    pub async fn pay(&mut self) -> Result<i64, SessionError> {
        let Phase::PaymentRequired { cost } = self.state.phase else {
            return Err(self.invalid("pay"));
        };
        let ledger = self.collaborators.ledger.clone();
        let student_id = self.request.student_id.clone();

        let balance = ledger.get_balance(&student_id).await?;
        if balance < cost {
            return Err(SessionError::InsufficientBalance { cost, balance });
        }

        let deduction = ledger
            .deduct(&student_id, &self.request.test_id, cost)
            .await
            .map_err(|e| match e {
                CollaboratorError::Rejected(reason) => SessionError::PaymentDeclined(reason),
                other => SessionError::Collaborator(other),
            })?;

        tracing::info!(
            session_id = %self.id,
            student_id = %student_id,
            cost,
            new_balance = deduction.new_balance,
            "Test fee deducted"
        );

        let next = admission::after_payment(self.loaded_test()?);
        match next {
            Admission::RequireInstructions => self.set_phase(Phase::Instructions),
            _ => {
                self.begin_attempt()?;
            }
        }
        Ok(deduction.new_balance)
    }

    /// The student accepted the rules disclosure.
    pub fn acknowledge_instructions(&mut self) -> Result<AttemptStarted, SessionError> {
        if self.state.phase != Phase::Instructions {
            return Err(self.invalid("acknowledge instructions"));
        }
        self.begin_attempt()
    }

    fn begin_attempt(&mut self) -> Result<AttemptStarted, SessionError> {
        let test = self.loaded_test()?;
        let duration = test.duration_seconds();
        let anti_cheat = test.enable_anti_cheat;

        self.state.started_at = Some(self.clock.now());
        self.state.cursor = 0;
        self.state.timer.start(duration);
        if anti_cheat {
            self.state.integrity.start();
        }
        self.set_phase(Phase::InProgress);

        Ok(AttemptStarted {
            request_fullscreen: anti_cheat,
            remaining_seconds: self.state.timer.remaining(),
        })
    }

    /// Guards every answer/navigation intent.
    fn ensure_editable(&self, action: &'static str) -> Result<(), SessionError> {
        if self.state.phase != Phase::InProgress {
            return Err(self.invalid(action));
        }
        if self.pipeline.payload().is_some() {
            return Err(SessionError::SubmissionFrozen);
        }
        if self.fullscreen_policy == FullscreenPolicy::Strict
            && self.state.integrity.is_active()
            && !self.state.integrity.is_fullscreen()
        {
            return Err(SessionError::FullscreenRequired);
        }
        Ok(())
    }

    pub fn record_answer(&mut self, index: usize, answer: Answer) -> Result<(), SessionError> {
        self.ensure_editable("answer")?;
        let len = self.questions.len();
        let question = self
            .questions
            .get(index)
            .ok_or(SessionError::QuestionOutOfRange { index, len })?;
        if !question.accepts(&answer) {
            return Err(SessionError::AnswerMismatch { index });
        }
        self.state.answers.set(index, answer)?;
        tracing::debug!(session_id = %self.id, index, "Answer recorded");
        Ok(())
    }

    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.ensure_editable("navigate")?;
        let len = self.questions.len();
        if index >= len {
            return Err(SessionError::QuestionOutOfRange { index, len });
        }
        self.state.cursor = index;
        Ok(index)
    }

    pub fn next(&mut self) -> Result<usize, SessionError> {
        let last = self.questions.len().saturating_sub(1);
        let target = (self.state.cursor + 1).min(last);
        self.go_to(target)
    }

    pub fn previous(&mut self) -> Result<usize, SessionError> {
        let target = self.state.cursor.saturating_sub(1);
        self.go_to(target)
    }

    /// Forwards a host signal to the integrity monitor. Never fails the session.
    pub fn observe_signal(&mut self, signal: &IntegritySignal) -> Verdict {
        if self.state.phase != Phase::InProgress {
            return Verdict::Allow;
        }
        let was_fullscreen = self.state.integrity.is_fullscreen();
        let verdict = self.state.integrity.observe(signal);
        if was_fullscreen && !self.state.integrity.is_fullscreen() {
            tracing::warn!(
                session_id = %self.id,
                policy = ?self.fullscreen_policy,
                "Student left fullscreen"
            );
        }
        verdict
    }

    /// Advances the countdown by one second. On expiry the attempt is
    /// submitted without any unanswered-question confirmation.
    /// Ticks outside `InProgress` are ignored.
    pub async fn tick(&mut self) -> Result<Option<SubmitOutcome>, SessionError> {
        if self.state.phase != Phase::InProgress {
            return Ok(None);
        }
        match self.state.timer.tick() {
            Some(TimerEvent::Expired) => {
                tracing::info!(session_id = %self.id, "Time expired, submitting");
                self.finish(SubmitTrigger::TimeExpired).await.map(Some)
            }
            Some(TimerEvent::Tick { .. }) | None => Ok(None),
        }
    }

    /// Student-initiated submit. With unanswered questions and no
    /// confirmation, nothing is sent and the count is reported back.
    pub async fn submit(&mut self, confirmed: bool) -> Result<SubmitOutcome, SessionError> {
        match self.state.phase {
            Phase::Submitting | Phase::Completed => return Ok(SubmitOutcome::Ignored),
            Phase::InProgress => {}
            _ => return Err(self.invalid("submit")),
        }
        let unanswered = self.unanswered_count();
        if !confirmed && unanswered > 0 && self.pipeline.payload().is_none() {
            return Ok(SubmitOutcome::AwaitingConfirmation { unanswered });
        }
        self.finish(SubmitTrigger::Manual).await
    }

    /// Leaving the test page. Needs confirmation; once confirmed the timer and
    /// monitor stop before anything else and the attempt is submitted.
    pub async fn exit(&mut self, confirmed: bool) -> Result<SubmitOutcome, SessionError> {
        match self.state.phase {
            Phase::Submitting | Phase::Completed => return Ok(SubmitOutcome::Ignored),
            Phase::InProgress => {}
            _ => return Err(self.invalid("exit")),
        }
        if !confirmed {
            return Ok(SubmitOutcome::AwaitingConfirmation {
                unanswered: self.unanswered_count(),
            });
        }
        self.stop_monitoring();
        self.finish(SubmitTrigger::ForcedExit).await
    }

    fn unanswered_count(&self) -> usize {
        self.state.answers.len() - self.state.answers.answered_count()
    }

    fn stop_monitoring(&mut self) {
        self.state.timer.stop();
        self.state.integrity.stop();
    }

    async fn finish(&mut self, trigger: SubmitTrigger) -> Result<SubmitOutcome, SessionError> {
        self.stop_monitoring();
        self.set_phase(Phase::Submitting);

        if self.pipeline.payload().is_none() {
            let payload = self.build_payload(trigger)?;
            self.pipeline.prepare(payload);
        }

        let delivered = self
            .pipeline
            .deliver()
            .await
            .map(|payload| {
                (
                    payload.score.clone(),
                    payload.trigger,
                    payload.telemetry.total_events(),
                )
            });
        match delivered {
            Ok((result, trigger, integrity_events)) => {
                tracing::info!(
                    session_id = %self.id,
                    student_id = %self.request.student_id,
                    test_id = %self.request.test_id,
                    final_marks = result.final_marks,
                    ?trigger,
                    integrity_events,
                    "Submission recorded"
                );
                self.set_phase(Phase::Completed);
                Ok(SubmitOutcome::Completed { result })
            }
            Err(SessionError::AlreadySubmitted) => {
                self.set_phase(Phase::Rejected {
                    reason: RejectReason::AlreadyAttempted,
                });
                Err(SessionError::AlreadySubmitted)
            }
            Err(e) => {
                self.set_phase(Phase::InProgress);
                Err(e)
            }
        }
    }

    fn build_payload(&mut self, trigger: SubmitTrigger) -> Result<SubmissionPayload, SessionError> {
        let ended_at = self.clock.now();
        let started_at = self.state.started_at.unwrap_or(ended_at);
        self.state.ended_at = Some(ended_at);

        let test = self.loaded_test()?;
        let result = scoring::score(
            &self.questions,
            self.state.answers.slots(),
            MarkingScheme::from(test),
        );
        Ok(submission::assemble(
            &self.request.student_id,
            test,
            result,
            started_at,
            ended_at,
            trigger,
            self.state.integrity.snapshot(),
        ))
    }

    /// Snapshot for the presentation layer.
    pub fn view(&self) -> SessionView {
        let completed = self.state.phase == Phase::Completed;
        let cursor = self.state.cursor;
        SessionView {
            session_id: self.id,
            phase: self.state.phase.clone(),
            test: self.test.as_ref().map(TestSummary::from),
            cursor,
            question_count: self.questions.len(),
            current_question: self.questions.get(cursor).map(PublicQuestion::from),
            current_answer: self.state.answers.get(cursor).cloned(),
            answered: self.state.answers.answered_flags(),
            answered_count: self.state.answers.answered_count(),
            remaining_seconds: self.state.timer.remaining(),
            result: self.result().cloned(),
            telemetry: completed.then(|| self.state.integrity.snapshot()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clients::memory::{InMemoryContentRepository, InMemoryLedger, InMemoryResultStore},
        engine::{integrity::ClipboardAction, timer::ManualClock},
        models::question::QuestionType,
    };

    struct Fixture {
        content: Arc<InMemoryContentRepository>,
        ledger: Arc<InMemoryLedger>,
        results: Arc<InMemoryResultStore>,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new(test: Test, questions: Vec<Question>) -> Self {
            let content = Arc::new(InMemoryContentRepository::new());
            content.insert(test, questions);
            Self {
                content,
                ledger: Arc::new(InMemoryLedger::new()),
                results: Arc::new(InMemoryResultStore::new()),
                clock: Arc::new(ManualClock::new(Utc::now())),
            }
        }

        fn controller(&self, policy: FullscreenPolicy) -> SessionController {
            let collaborators = Collaborators {
                content: self.content.clone(),
                ledger: self.ledger.clone(),
                results: self.results.clone(),
            };
            SessionController::new(
                SessionRequest {
                    student_id: "s1".into(),
                    student_class: "8".into(),
                    test_id: "t1".into(),
                    premium: false,
                },
                collaborators,
                self.clock.clone(),
                policy,
            )
        }
    }

    fn base_test() -> Test {
        Test {
            id: "t1".into(),
            title: "Geography".into(),
            subject: "social".into(),
            target_class: "8".into(),
            duration_minutes: None,
            marks_per_question: 1.0,
            negative_marking: true,
            negative_marks_per_question: 0.25,
            enable_anti_cheat: false,
            show_instructions: false,
            mandatory: false,
            coin_cost: 0,
            premium: false,
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: format!("q{}", i),
                text: format!("Question {}", i),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_option_index: Some(0),
                question_type: QuestionType::Mcq,
                correct_answer: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_free_test_goes_straight_in() {
        let fx = Fixture::new(base_test(), questions(3));
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        assert_eq!(c.open().await.unwrap(), &Phase::InProgress);
        assert_eq!(c.remaining_seconds(), None);
        assert!(!c.timer_running());
    }

    #[tokio::test]
    async fn test_answers_rejected_outside_in_progress() {
        let mut t = base_test();
        t.show_instructions = true;
        let fx = Fixture::new(t, questions(2));
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        c.open().await.unwrap();
        assert_eq!(c.phase(), &Phase::Instructions);

        let err = c.record_answer(0, Answer::Choice(0)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));

        c.acknowledge_instructions().unwrap();
        c.record_answer(0, Answer::Choice(0)).unwrap();
        assert!(matches!(
            c.record_answer(0, Answer::Text("A".into())),
            Err(SessionError::AnswerMismatch { index: 0 })
        ));
    }

    #[tokio::test]
    async fn test_paid_test_with_low_balance_never_starts() {
        let mut t = base_test();
        t.coin_cost = 10;
        let fx = Fixture::new(t, questions(2));
        fx.ledger.set_balance("s1", 4);
        let mut c = fx.controller(FullscreenPolicy::Lenient);

        c.load().await.unwrap();
        let decision = c.admit().await.unwrap();
        assert_eq!(decision, Admission::InsufficientBalance { cost: 10, balance: 4 });
        assert_eq!(c.phase(), &Phase::PaymentRequired { cost: 10 });

        let err = c.pay().await.unwrap_err();
        assert!(matches!(err, SessionError::InsufficientBalance { cost: 10, balance: 4 }));
        assert_eq!(c.phase(), &Phase::PaymentRequired { cost: 10 });
        assert!(fx.ledger.deductions().is_empty());

        // top up and retry
        fx.ledger.set_balance("s1", 25);
        assert_eq!(c.pay().await.unwrap(), 15);
        assert_eq!(c.phase(), &Phase::InProgress);
    }

    #[tokio::test]
    async fn test_rejections() {
        let fx = Fixture::new(base_test(), questions(2));
        fx.content.mark_attempted("s1", "t1");
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        assert_eq!(
            c.open().await.unwrap(),
            &Phase::Rejected {
                reason: RejectReason::AlreadyAttempted
            }
        );
        assert!(c.submit(true).await.is_err());

        let fx = Fixture::new(base_test(), vec![]);
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        assert_eq!(
            c.open().await.unwrap(),
            &Phase::Rejected {
                reason: RejectReason::NoQuestions
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_question_fails_load() {
        let mut qs = questions(2);
        qs[1].correct_option_index = Some(9);
        let fx = Fixture::new(base_test(), qs);
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        assert!(matches!(
            c.load().await,
            Err(SessionError::InvalidContent(_))
        ));
        assert_eq!(c.phase(), &Phase::Loading);
    }

    #[tokio::test]
    async fn test_invalid_test_config_fails_load() {
        let mut zero_length = base_test();
        zero_length.duration_minutes = Some(0);
        let fx = Fixture::new(zero_length, questions(2));
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        assert!(matches!(
            c.open().await,
            Err(SessionError::InvalidContent(_))
        ));
        assert_eq!(c.phase(), &Phase::Loading);
        assert!(!c.timer_running());

        let mut negative = base_test();
        negative.marks_per_question = -1.0;
        let fx = Fixture::new(negative, questions(2));
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        assert!(matches!(
            c.load().await,
            Err(SessionError::InvalidContent(_))
        ));
    }

    #[tokio::test]
    async fn test_navigation_is_clamped() {
        let fx = Fixture::new(base_test(), questions(3));
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        c.open().await.unwrap();
        assert_eq!(c.previous().unwrap(), 0);
        assert_eq!(c.next().unwrap(), 1);
        assert_eq!(c.go_to(2).unwrap(), 2);
        assert_eq!(c.next().unwrap(), 2);
        assert!(c.go_to(3).is_err());
    }

    #[tokio::test]
    async fn test_manual_submit_asks_for_confirmation() {
        let fx = Fixture::new(base_test(), questions(2));
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        c.open().await.unwrap();
        c.record_answer(0, Answer::Choice(0)).unwrap();

        assert_eq!(
            c.submit(false).await.unwrap(),
            SubmitOutcome::AwaitingConfirmation { unanswered: 1 }
        );
        assert_eq!(fx.results.write_attempts(), 0);

        let SubmitOutcome::Completed { result } = c.submit(true).await.unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(result.final_marks, 1.0);
        assert_eq!(c.submit(true).await.unwrap(), SubmitOutcome::Ignored);
        assert_eq!(fx.results.write_attempts(), 1);
    }

    #[tokio::test]
    async fn test_timer_expiry_submits_once() {
        let mut t = base_test();
        t.duration_minutes = Some(1);
        let fx = Fixture::new(t, questions(2));
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        c.open().await.unwrap();
        c.record_answer(0, Answer::Choice(0)).unwrap();

        for _ in 0..59 {
            fx.clock.advance(1);
            assert!(c.tick().await.unwrap().is_none());
        }
        assert_eq!(c.remaining_seconds(), Some(1));
        fx.clock.advance(1);
        let outcome = c.tick().await.unwrap();
        assert!(matches!(outcome, Some(SubmitOutcome::Completed { .. })));
        assert_eq!(c.phase(), &Phase::Completed);

        // stale tick after submission does nothing
        assert!(c.tick().await.unwrap().is_none());
        assert_eq!(fx.results.write_attempts(), 1);

        let payload = fx.results.get("s1", "t1").unwrap();
        assert_eq!(payload.trigger, SubmitTrigger::TimeExpired);
        assert_eq!(payload.elapsed_seconds, 60);
        assert_eq!(payload.score.unanswered_count, 1);
        assert_eq!(payload.score.penalty_marks, 0.0);
    }

    #[tokio::test]
    async fn test_failed_submission_is_retryable() {
        let fx = Fixture::new(base_test(), questions(1));
        fx.results.fail_next(1);
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        c.open().await.unwrap();
        c.record_answer(0, Answer::Choice(1)).unwrap();

        let err = c.submit(true).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(c.phase(), &Phase::InProgress);
        assert!(c.payload().is_some());
        assert!(matches!(
            c.record_answer(0, Answer::Choice(0)),
            Err(SessionError::SubmissionFrozen)
        ));

        let SubmitOutcome::Completed { result } = c.submit(false).await.unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(result.incorrect_count, 1);
        assert_eq!(result.final_marks, 0.0);
        assert_eq!(fx.results.stored().len(), 1);
    }

    #[tokio::test]
    async fn test_exit_requires_confirmation_and_stops_monitoring() {
        let mut t = base_test();
        t.duration_minutes = Some(10);
        t.enable_anti_cheat = true;
        let fx = Fixture::new(t, questions(2));
        let mut c = fx.controller(FullscreenPolicy::Lenient);
        c.open().await.unwrap();
        let started = c.acknowledge_instructions().unwrap();
        assert!(started.request_fullscreen);
        assert_eq!(started.remaining_seconds, Some(600));

        c.observe_signal(&IntegritySignal::Clipboard {
            action: ClipboardAction::Copy,
        });
        assert!(matches!(
            c.exit(false).await.unwrap(),
            SubmitOutcome::AwaitingConfirmation { unanswered: 2 }
        ));
        assert!(c.timer_running());

        c.exit(true).await.unwrap();
        assert!(!c.timer_running());
        assert!(!c.state().integrity.is_active());
        let view = c.view();
        assert_eq!(view.telemetry.unwrap().clipboard_attempts, 1);
        assert_eq!(
            fx.results.get("s1", "t1").unwrap().trigger,
            SubmitTrigger::ForcedExit
        );
    }

    #[tokio::test]
    async fn test_strict_fullscreen_policy_blocks_answers() {
        let mut t = base_test();
        t.enable_anti_cheat = true;
        let fx = Fixture::new(t, questions(1));
        let mut c = fx.controller(FullscreenPolicy::Strict);
        c.open().await.unwrap();
        c.acknowledge_instructions().unwrap();

        assert!(matches!(
            c.record_answer(0, Answer::Choice(0)),
            Err(SessionError::FullscreenRequired)
        ));
        c.observe_signal(&IntegritySignal::FullscreenChange { active: true });
        c.record_answer(0, Answer::Choice(0)).unwrap();
    }
}
