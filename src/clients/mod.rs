// src/clients/mod.rs

//! Contracts for the external services the engine consumes, plus HTTP and
//! in-memory implementations.

pub mod http;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::CollaboratorError,
    models::{question::Question, submission::SubmissionPayload, test::Test},
};

/// Read-only source of tests, questions and attempt history.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn get_test(&self, test_id: &str) -> Result<Option<Test>, CollaboratorError>;

    /// Questions in presentation order.
    async fn get_questions(&self, test_id: &str) -> Result<Vec<Question>, CollaboratorError>;

    async fn has_prior_attempt(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> Result<bool, CollaboratorError>;
}

/// Result of a successful ledger deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub new_balance: i64,
}

/// Spendable student balance.
#[async_trait]
pub trait LedgerService: Send + Sync {
    async fn get_balance(&self, student_id: &str) -> Result<i64, CollaboratorError>;

    /// Atomically deducts `amount` for `test_id`. Refusals come back as `Rejected`.
    async fn deduct(
        &self,
        student_id: &str,
        test_id: &str,
        amount: i64,
    ) -> Result<Deduction, CollaboratorError>;
}

/// Durable sink for finished attempts. Rejects a second payload for the same
/// (student, test) pair with `CollaboratorError::Duplicate`.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), CollaboratorError>;
}

/// Bundle of collaborator handles shared by every session.
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentRepository>,
    pub ledger: Arc<dyn LedgerService>,
    pub results: Arc<dyn ResultStore>,
}
