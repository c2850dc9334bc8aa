// src/models/session.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    answer::Answer,
    question::PublicQuestion,
    submission::{IntegrityTelemetry, ScoreResult},
    test::TestSummary,
};

/// Terminal admission failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    AlreadyAttempted,
    TestNotFound,
    WrongClass,
    NoQuestions,
}

/// Lifecycle of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Rejected { reason: RejectReason },
    AdmissionPending,
    PaymentRequired { cost: i64 },
    Instructions,
    InProgress,
    Submitting,
    Completed,
}

impl Phase {
    /// No further intent can change a session in this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Rejected { .. } | Phase::Completed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Loading => "loading",
            Phase::Rejected { .. } => "rejected",
            Phase::AdmissionPending => "admission_pending",
            Phase::PaymentRequired { .. } => "payment_required",
            Phase::Instructions => "instructions",
            Phase::InProgress => "in_progress",
            Phase::Submitting => "submitting",
            Phase::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Who is attempting which test.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SessionRequest {
    #[validate(length(min = 1, max = 100))]
    pub student_id: String,
    #[validate(length(min = 1, max = 20))]
    pub student_class: String,
    #[validate(length(min = 1, max = 100))]
    pub test_id: String,
    /// Pre-authorized premium entry: skips the payment screen.
    #[serde(default)]
    pub premium: bool,
}

/// Read-only snapshot handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub phase: Phase,
    pub test: Option<TestSummary>,
    pub cursor: usize,
    pub question_count: usize,
    pub current_question: Option<PublicQuestion>,
    pub current_answer: Option<Answer>,
    pub answered: Vec<bool>,
    pub answered_count: usize,
    pub remaining_seconds: Option<u64>,
    /// Only populated once the session is completed.
    pub result: Option<ScoreResult>,
    /// Only populated once the session is completed.
    pub telemetry: Option<IntegrityTelemetry>,
}
