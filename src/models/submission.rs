// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counted signals of possibly dishonest behaviour. Counters only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityTelemetry {
    pub visibility_losses: u32,
    pub clipboard_attempts: u32,
    pub context_menu_attempts: u32,
    pub fullscreen_exits: u32,
    /// Disallowed key combinations other than clipboard shortcuts.
    pub blocked_shortcuts: u32,
    pub is_fullscreen: bool,
}

impl IntegrityTelemetry {
    pub fn total_events(&self) -> u32 {
        self.visibility_losses
            + self.clipboard_attempts
            + self.context_menu_attempts
            + self.fullscreen_exits
            + self.blocked_shortcuts
    }
}

/// Per-question line of the graded result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub question_id: String,
    pub question: String,
    pub user_answer_text: String,
    pub correct_answer_text: String,
    pub is_correct: bool,
    /// False when the slot is untouched or blank; such slots are never penalized.
    pub answered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub unanswered_count: usize,
    pub achieved_marks: f64,
    pub penalty_marks: f64,
    /// `max(0, achieved - penalty)`.
    pub final_marks: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub details: Vec<QuestionDetail>,
}

/// Why the attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Manual,
    TimeExpired,
    ForcedExit,
}

/// The single record written to the result store for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub student_id: String,
    pub test_id: String,
    pub test_title: String,
    pub subject: String,
    pub score: ScoreResult,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub trigger: SubmitTrigger,
    pub telemetry: IntegrityTelemetry,
}
