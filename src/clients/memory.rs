// src/clients/memory.rs

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    clients::{ContentRepository, Deduction, LedgerService, ResultStore},
    error::CollaboratorError,
    models::{question::Question, submission::SubmissionPayload, test::Test},
};

/// Content repository backed by a map. Useful for local runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryContentRepository {
    tests: Mutex<HashMap<String, (Test, Vec<Question>)>>,
    attempts: Mutex<HashSet<(String, String)>>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, test: Test, questions: Vec<Question>) {
        self.tests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(test.id.clone(), (test, questions));
    }

    pub fn mark_attempted(&self, student_id: &str, test_id: &str) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((student_id.to_string(), test_id.to_string()));
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn get_test(&self, test_id: &str) -> Result<Option<Test>, CollaboratorError> {
        let tests = self.tests.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tests.get(test_id).map(|(t, _)| t.clone()))
    }

    async fn get_questions(&self, test_id: &str) -> Result<Vec<Question>, CollaboratorError> {
        let tests = self.tests.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tests.get(test_id).map(|(_, q)| q.clone()).unwrap_or_default())
    }

    async fn has_prior_attempt(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> Result<bool, CollaboratorError> {
        let attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(attempts.contains(&(student_id.to_string(), test_id.to_string())))
    }
}

/// Ledger backed by a balance map. Deductions are checked and applied under one lock.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<String, i64>>,
    deductions: Mutex<Vec<(String, String, i64)>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, student_id: &str, balance: i64) {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(student_id.to_string(), balance);
    }

    /// Recorded (student, test, amount) triples, oldest first.
    pub fn deductions(&self) -> Vec<(String, String, i64)> {
        self.deductions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LedgerService for InMemoryLedger {
    async fn get_balance(&self, student_id: &str) -> Result<i64, CollaboratorError> {
        let balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(balances.get(student_id).copied().unwrap_or(0))
    }

    async fn deduct(
        &self,
        student_id: &str,
        test_id: &str,
        amount: i64,
    ) -> Result<Deduction, CollaboratorError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = balances.entry(student_id.to_string()).or_insert(0);
        if *balance < amount {
            return Err(CollaboratorError::Rejected(format!(
                "insufficient balance: {} < {}",
                balance, amount
            )));
        }
        *balance -= amount;
        let new_balance = *balance;
        drop(balances);

        self.deductions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((student_id.to_string(), test_id.to_string(), amount));
        Ok(Deduction { new_balance })
    }
}

/// Result store with a (student, test) uniqueness constraint.
/// `fail_next` makes the following writes fail with `Unavailable`.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    results: Mutex<HashMap<(String, String), SubmissionPayload>>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Number of write calls received, successful or not.
    pub fn write_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<SubmissionPayload> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, student_id: &str, test_id: &str) -> Option<SubmissionPayload> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(student_id.to_string(), test_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), CollaboratorError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(CollaboratorError::Unavailable(
                "result store offline".to_string(),
            ));
        }

        let key = (payload.student_id.clone(), payload.test_id.clone());
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        if results.contains_key(&key) {
            return Err(CollaboratorError::Duplicate {
                student_id: key.0,
                test_id: key.1,
            });
        }
        results.insert(key, payload.clone());
        Ok(())
    }
}
