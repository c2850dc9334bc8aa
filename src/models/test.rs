// src/models/test.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Immutable test configuration, as served by the content repository.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Test {
    #[validate(length(min = 1, max = 100))]
    pub id: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    pub subject: String,

    /// Class (grade) the test is meant for. Students of other classes are turned away.
    pub target_class: String,

    /// Duration in minutes. `None` means the test is untimed.
    #[validate(range(min = 1))]
    pub duration_minutes: Option<u32>,

    #[validate(range(min = 0.0))]
    pub marks_per_question: f64,

    #[serde(default)]
    pub negative_marking: bool,

    /// Marks subtracted per incorrect answer. Ignored unless `negative_marking` is set.
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub negative_marks_per_question: f64,

    #[serde(default)]
    pub enable_anti_cheat: bool,

    #[serde(default)]
    pub show_instructions: bool,

    /// Mandatory tests are never payment-gated.
    #[serde(default)]
    pub mandatory: bool,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub coin_cost: i64,

    #[serde(default)]
    pub premium: bool,
}

impl Test {
    pub fn duration_seconds(&self) -> Option<u64> {
        self.duration_minutes.map(|m| u64::from(m) * 60)
    }

    /// Penalty actually applied per incorrect answer.
    pub fn penalty_per_question(&self) -> f64 {
        if self.negative_marking {
            self.negative_marks_per_question
        } else {
            0.0
        }
    }

    /// The rules disclosure must be acknowledged before monitoring starts,
    /// so anti-cheat tests always go through the instructions screen.
    pub fn requires_disclosure(&self) -> bool {
        self.show_instructions || self.enable_anti_cheat
    }
}

/// Test fields exposed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct TestSummary {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub duration_minutes: Option<u32>,
    pub marks_per_question: f64,
    pub negative_marking: bool,
    pub negative_marks_per_question: f64,
    pub enable_anti_cheat: bool,
    pub coin_cost: i64,
    pub premium: bool,
}

impl From<&Test> for TestSummary {
    fn from(t: &Test) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            subject: t.subject.clone(),
            duration_minutes: t.duration_minutes,
            marks_per_question: t.marks_per_question,
            negative_marking: t.negative_marking,
            negative_marks_per_question: t.penalty_per_question(),
            enable_anti_cheat: t.enable_anti_cheat,
            coin_cost: t.coin_cost,
            premium: t.premium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Test {
        serde_json::from_value(serde_json::json!({
            "id": "t-1",
            "title": "Algebra basics",
            "subject": "math",
            "target_class": "8",
            "duration_minutes": 2,
            "marks_per_question": 1.0,
            "negative_marks_per_question": 0.25
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_and_duration() {
        let t = sample();
        assert_eq!(t.duration_seconds(), Some(120));
        assert!(!t.negative_marking);
        assert_eq!(t.penalty_per_question(), 0.0);
        assert_eq!(t.coin_cost, 0);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_anti_cheat_forces_disclosure() {
        let mut t = sample();
        assert!(!t.requires_disclosure());
        t.enable_anti_cheat = true;
        assert!(t.requires_disclosure());
    }

    #[test]
    fn test_zero_duration_is_invalid() {
        let mut t = sample();
        t.duration_minutes = Some(0);
        assert!(t.validate().is_err());
    }
}
