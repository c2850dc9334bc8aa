// src/engine/admission.rs

use crate::models::{session::RejectReason, test::Test};

/// Everything the gate needs to know about an attempt.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionContext<'a> {
    pub test: &'a Test,
    pub question_count: usize,
    pub prior_attempt: bool,
    pub student_class: &'a str,
    pub premium_override: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Reject(RejectReason),
    RequirePayment { cost: i64 },
    /// Blocks progression but is not terminal; the student may top up and retry.
    InsufficientBalance { cost: i64, balance: i64 },
    RequireInstructions,
    Proceed,
}

/// Coin cost to charge, if the attempt is payment-gated.
pub fn payment_due(test: &Test, premium_override: bool) -> Option<i64> {
    (!test.mandatory && test.coin_cost > 0 && !premium_override).then_some(test.coin_cost)
}

/// Terminal eligibility checks, in order: prior attempt, class, question set.
pub fn check_eligibility(ctx: &AdmissionContext<'_>) -> Result<(), RejectReason> {
    if ctx.prior_attempt {
        return Err(RejectReason::AlreadyAttempted);
    }
    if !ctx
        .test
        .target_class
        .trim()
        .eq_ignore_ascii_case(ctx.student_class.trim())
    {
        return Err(RejectReason::WrongClass);
    }
    if ctx.question_count == 0 {
        return Err(RejectReason::NoQuestions);
    }
    Ok(())
}

/// Decides the next screen for an attempt.
///
/// `balance` is only consulted when payment is due; pass `None` when it has
/// not been fetched (payment is then reported as required).
pub fn evaluate(ctx: &AdmissionContext<'_>, balance: Option<i64>) -> Admission {
    if let Err(reason) = check_eligibility(ctx) {
        return Admission::Reject(reason);
    }
    if let Some(cost) = payment_due(ctx.test, ctx.premium_override) {
        return match balance {
            Some(balance) if balance < cost => Admission::InsufficientBalance { cost, balance },
            _ => Admission::RequirePayment { cost },
        };
    }
    after_payment(ctx.test)
}

/// The step that follows a settled (or waived) payment.
pub fn after_payment(test: &Test) -> Admission {
    if test.requires_disclosure() {
        Admission::RequireInstructions
    } else {
        Admission::Proceed
    }
}
