// src/models/answer.rs

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// A student's response to one question.
/// Serialized untagged: a number is an option index, a string is free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Choice(usize),
    Text(String),
}

impl Answer {
    /// Blank free text counts as unanswered for marking.
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Choice(_) => false,
            Answer::Text(t) => t.trim().is_empty(),
        }
    }
}

/// One slot per question, pre-populated with `None`. Slots are overwritten, never removed.
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    slots: Vec<Option<Answer>>,
}

impl AnswerStore {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&Answer> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn set(&mut self, index: usize, answer: Answer) -> Result<(), SessionError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(SessionError::QuestionOutOfRange { index, len })?;
        *slot = Some(answer);
        Ok(())
    }

    pub fn slots(&self) -> &[Option<Answer>] {
        &self.slots
    }

    /// Per-question answered flags, in question order.
    pub fn answered_flags(&self) -> Vec<bool> {
        self.slots
            .iter()
            .map(|s| s.as_ref().is_some_and(|a| !a.is_blank()))
            .collect()
    }

    pub fn answered_count(&self) -> usize {
        self.answered_flags().into_iter().filter(|f| *f).count()
    }
}
