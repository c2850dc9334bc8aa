// src/engine/submission.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    clients::ResultStore,
    error::{CollaboratorError, SessionError},
    models::{
        submission::{IntegrityTelemetry, ScoreResult, SubmissionPayload, SubmitTrigger},
        test::Test,
    },
};

/// Builds the payload for one finished attempt.
pub fn assemble(
    student_id: &str,
    test: &Test,
    score: ScoreResult,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    trigger: SubmitTrigger,
    telemetry: IntegrityTelemetry,
) -> SubmissionPayload {
    SubmissionPayload {
        student_id: student_id.to_string(),
        test_id: test.id.clone(),
        test_title: test.title.clone(),
        subject: test.subject.clone(),
        score,
        started_at,
        ended_at,
        elapsed_seconds: (ended_at - started_at).num_seconds().max(0),
        trigger,
        telemetry,
    }
}

/// Holds the one payload of a session and delivers it to the result store.
///
/// The payload is kept after a failed write so a retry sends exactly the
/// same record; once delivered it is never sent again.
pub struct SubmissionPipeline {
    store: Arc<dyn ResultStore>,
    pending: Option<SubmissionPayload>,
    delivered: bool,
    failed_attempts: u32,
}

impl SubmissionPipeline {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self {
            store,
            pending: None,
            delivered: false,
            failed_attempts: 0,
        }
    }

    /// Stores `payload` unless one is already held; a held payload is never replaced.
    pub fn prepare(&mut self, payload: SubmissionPayload) {
        if self.pending.is_none() {
            self.pending = Some(payload);
        }
    }

    pub fn payload(&self) -> Option<&SubmissionPayload> {
        self.pending.as_ref()
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    /// Performs the write. A duplicate reported on a retry means an earlier
    /// attempt reached the store, so it counts as delivered.
    pub async fn deliver(&mut self) -> Result<&SubmissionPayload, SessionError> {
        let Some(payload) = self.pending.as_ref() else {
            return Err(SessionError::SubmissionFailed(
                "no payload has been prepared".to_string(),
            ));
        };
        if self.delivered {
            return Ok(payload);
        }

        match self.store.submit(payload).await {
            Ok(()) => {}
            Err(CollaboratorError::Duplicate { .. }) if self.failed_attempts > 0 => {
                tracing::warn!(
                    student_id = %payload.student_id,
                    test_id = %payload.test_id,
                    "Result store already holds this submission; treating retry as delivered"
                );
            }
            Err(CollaboratorError::Duplicate { .. }) => {
                return Err(SessionError::AlreadySubmitted);
            }
            Err(e) => {
                self.failed_attempts += 1;
                tracing::error!(
                    student_id = %payload.student_id,
                    test_id = %payload.test_id,
                    attempt = self.failed_attempts,
                    "Failed to write submission: {}",
                    e
                );
                return Err(SessionError::SubmissionFailed(e.to_string()));
            }
        }

        self.delivered = true;
        Ok(payload)
    }
}
