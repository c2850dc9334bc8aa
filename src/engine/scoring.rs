// src/engine/scoring.rs

use crate::models::{
    answer::Answer,
    question::Question,
    submission::{QuestionDetail, ScoreResult},
    test::Test,
};

/// Text shown for slots the student never touched.
pub const NOT_ANSWERED: &str = "Not answered";

/// Marks awarded and deducted per question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkingScheme {
    pub marks_per_question: f64,
    pub penalty_per_question: f64,
}

impl From<&Test> for MarkingScheme {
    fn from(test: &Test) -> Self {
        Self {
            marks_per_question: test.marks_per_question,
            penalty_per_question: test.penalty_per_question(),
        }
    }
}

/// Canonical form for free-text comparison: lower-cased, outer whitespace trimmed.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn is_correct(question: &Question, answer: &Answer) -> bool {
    match answer {
        Answer::Choice(idx) => {
            question.question_type.is_choice() && question.correct_option_index == Some(*idx)
        }
        Answer::Text(text) => {
            !question.question_type.is_choice()
                && question
                    .correct_answer
                    .as_deref()
                    .is_some_and(|canonical| normalize(text) == normalize(canonical))
        }
    }
}

/// Grades `answers` against `questions` (same order, same length).
///
/// * Unanswered slots (`None` or blank text) are neither rewarded nor penalized.
/// * `final_marks = max(0, correct * marks - incorrect * penalty)`.
pub fn score(questions: &[Question], answers: &[Option<Answer>], scheme: MarkingScheme) -> ScoreResult {
    let mut correct_count = 0;
    let mut incorrect_count = 0;
    let mut unanswered_count = 0;
    let mut details = Vec::with_capacity(questions.len());

    for (i, question) in questions.iter().enumerate() {
        let slot = answers.get(i).and_then(Option::as_ref);

        let (user_answer_text, answered, correct) = match slot {
            None => (NOT_ANSWERED.to_string(), false, false),
            Some(answer) if answer.is_blank() => (question.answer_text(answer), false, false),
            Some(answer) => (question.answer_text(answer), true, is_correct(question, answer)),
        };

        if !answered {
            unanswered_count += 1;
        } else if correct {
            correct_count += 1;
        } else {
            incorrect_count += 1;
        }

        details.push(QuestionDetail {
            question_id: question.id.clone(),
            question: question.text.clone(),
            user_answer_text,
            correct_answer_text: question.correct_answer_text(),
            is_correct: correct,
            answered,
        });
    }

    let achieved_marks = correct_count as f64 * scheme.marks_per_question;
    let penalty_marks = incorrect_count as f64 * scheme.penalty_per_question;
    let final_marks = (achieved_marks - penalty_marks).max(0.0);
    let total_marks = questions.len() as f64 * scheme.marks_per_question;
    let percentage = if total_marks > 0.0 {
        final_marks / total_marks * 100.0
    } else {
        0.0
    };

    ScoreResult {
        correct_count,
        incorrect_count,
        unanswered_count,
        achieved_marks,
        penalty_marks,
        final_marks,
        total_marks,
        percentage,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;

    fn mcq(id: &str, correct: usize) -> Question {
        Question {
            id: id.into(),
            text: format!("question {}", id),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_option_index: Some(correct),
            question_type: QuestionType::Mcq,
            correct_answer: None,
        }
    }

    fn one_word(id: &str, canonical: &str) -> Question {
        Question {
            id: id.into(),
            text: format!("question {}", id),
            options: vec![],
            correct_option_index: None,
            question_type: QuestionType::OneWord,
            correct_answer: Some(canonical.into()),
        }
    }

    fn scheme(penalty: f64) -> MarkingScheme {
        MarkingScheme {
            marks_per_question: 1.0,
            penalty_per_question: penalty,
        }
    }

    #[test]
    fn test_normalize_rules() {
        assert_eq!(normalize(" Paris "), normalize("paris"));
        assert_ne!(normalize("Paris "), normalize("Paris."));
        assert_eq!(normalize("\tNEW Delhi\n"), "new delhi");
        // inner whitespace is significant
        assert_ne!(normalize("New  Delhi"), normalize("New Delhi"));
    }

    #[test]
    fn test_three_right_two_wrong_with_penalty() {
        let questions: Vec<_> = (0..5).map(|i| mcq(&i.to_string(), 0)).collect();
        let answers = vec![
            Some(Answer::Choice(0)),
            Some(Answer::Choice(0)),
            Some(Answer::Choice(0)),
            Some(Answer::Choice(1)),
            Some(Answer::Choice(2)),
        ];
        let r = score(&questions, &answers, scheme(0.25));
        assert_eq!(r.correct_count, 3);
        assert_eq!(r.incorrect_count, 2);
        assert_eq!(r.achieved_marks, 3.0);
        assert_eq!(r.penalty_marks, 0.5);
        assert_eq!(r.final_marks, 2.5);
        assert_eq!(r.percentage, 50.0);
    }

    #[test]
    fn test_unanswered_is_not_penalized() {
        let questions: Vec<_> = (0..5).map(|i| mcq(&i.to_string(), 2)).collect();
        let answers = vec![
            Some(Answer::Choice(2)),
            None,
            Some(Answer::Choice(2)),
            None,
            Some(Answer::Choice(2)),
        ];
        let r = score(&questions, &answers, scheme(0.25));
        assert_eq!(r.correct_count, 3);
        assert_eq!(r.incorrect_count, 0);
        assert_eq!(r.unanswered_count, 2);
        assert_eq!(r.penalty_marks, 0.0);
        assert_eq!(r.final_marks, 3.0);
        assert_eq!(r.details[1].user_answer_text, NOT_ANSWERED);
        assert!(!r.details[1].answered);
    }

    #[test]
    fn test_final_marks_never_negative() {
        let questions: Vec<_> = (0..4).map(|i| mcq(&i.to_string(), 0)).collect();
        let answers = vec![Some(Answer::Choice(3)); 4];
        for penalty in [0.25, 1.0, 5.0, 100.0] {
            let r = score(&questions, &answers, scheme(penalty));
            assert_eq!(r.final_marks, 0.0);
            assert!(r.penalty_marks > r.achieved_marks);
        }
    }

    #[test]
    fn test_text_answers_normalized() {
        let questions = vec![one_word("a", "Paris"), one_word("b", "Paris"), one_word("c", "Paris")];
        let answers = vec![
            Some(Answer::Text(" paris ".into())),
            Some(Answer::Text("Paris.".into())),
            Some(Answer::Text("   ".into())),
        ];
        let r = score(&questions, &answers, scheme(1.0));
        assert_eq!(r.correct_count, 1);
        assert_eq!(r.incorrect_count, 1);
        assert_eq!(r.unanswered_count, 1);
        // touched but blank: shown as typed, not correct, not penalized
        assert!(!r.details[2].is_correct);
        assert_eq!(r.details[2].user_answer_text, "   ");
        assert_eq!(r.final_marks, 0.0);
    }

    #[test]
    fn test_choice_score_counts_matching_indices_only() {
        let questions = vec![mcq("a", 0), mcq("b", 1), mcq("c", 2)];
        let answers = vec![Some(Answer::Choice(0)), Some(Answer::Choice(0)), Some(Answer::Choice(2))];
        let r = score(&questions, &answers, scheme(0.0));
        assert_eq!(r.correct_count, 2);
        assert_eq!(r.final_marks, 2.0);
        assert_eq!(r.details[1].user_answer_text, "A");
        assert_eq!(r.details[1].correct_answer_text, "B");
    }

    #[test]
    fn test_mismatched_answer_kind_is_incorrect() {
        let questions = vec![mcq("a", 0)];
        let answers = vec![Some(Answer::Text("A".into()))];
        let r = score(&questions, &answers, scheme(0.0));
        assert_eq!(r.correct_count, 0);
        assert_eq!(r.incorrect_count, 1);
    }
}
