// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::SessionError, models::answer::Answer};

/// Explicit question type tag. Every question must carry one; there is no
/// inference from the shape of the options list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    FillBlank,
    OneWord,
    ShortAnswer,
}

impl QuestionType {
    /// Choice types are answered with an option index, the rest with free text.
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::Mcq | QuestionType::TrueFalse)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Question {
    #[validate(length(min = 1, max = 100))]
    pub id: String,

    /// The text content of the question.
    #[validate(length(min = 1, max = 2000))]
    pub text: String,

    /// Ordered options (e.g., ["Option A", "Option B"]). Empty for text types.
    #[serde(default)]
    pub options: Vec<String>,

    /// Zero-based index of the correct option. Only meaningful for choice types.
    #[serde(default)]
    pub correct_option_index: Option<usize>,

    /// Mapped from the field 'type' since `type` is a reserved keyword in Rust.
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// Canonical answer for text types.
    #[serde(default)]
    pub correct_answer: Option<String>,
}

impl Question {
    /// Ingestion check: field lengths plus the per-type answer key invariant.
    pub fn check(&self) -> Result<(), SessionError> {
        self.validate()
            .map_err(|e| SessionError::InvalidContent(format!("question {}: {}", self.id, e)))?;

        let invalid = |reason: &str| -> Result<(), SessionError> {
            Err(SessionError::InvalidContent(format!(
                "question {}: {}",
                self.id, reason
            )))
        };

        if self.question_type.is_choice() {
            match self.correct_option_index {
                Some(idx) if idx < self.options.len() => {}
                Some(_) => return invalid("correct option index out of range"),
                None => return invalid("missing correct option index"),
            }
            if self.question_type == QuestionType::TrueFalse && self.options.len() != 2 {
                return invalid("true/false questions need exactly two options");
            }
        } else {
            let has_canonical = self
                .correct_answer
                .as_deref()
                .is_some_and(|a| !a.trim().is_empty());
            if !has_canonical {
                return invalid("missing canonical answer");
            }
        }
        Ok(())
    }

    /// Whether `answer` has the right shape for this question.
    pub fn accepts(&self, answer: &Answer) -> bool {
        match answer {
            Answer::Choice(idx) => self.question_type.is_choice() && *idx < self.options.len(),
            Answer::Text(_) => !self.question_type.is_choice(),
        }
    }

    /// Human-readable form of the correct answer.
    pub fn correct_answer_text(&self) -> String {
        if self.question_type.is_choice() {
            self.correct_option_index
                .and_then(|i| self.options.get(i))
                .cloned()
                .unwrap_or_default()
        } else {
            self.correct_answer.clone().unwrap_or_default()
        }
    }

    /// Human-readable form of a given answer.
    pub fn answer_text(&self, answer: &Answer) -> String {
        match answer {
            Answer::Choice(i) => self.options.get(*i).cloned().unwrap_or_default(),
            Answer::Text(t) => t.clone(),
        }
    }
}

/// DTO for sending a question to the client (excludes the answer key).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question_type: q.question_type,
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}
