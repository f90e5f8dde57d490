use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::LoanId;

#[derive(Error, Debug)]
pub enum LendingError {
    #[error("invalid term: {term_weeks} weeks, term must be between 1 and {max} weeks", max = crate::types::MAX_TERM_WEEKS)]
    InvalidTerm {
        term_weeks: i64,
    },

    #[error("invalid principal: {principal}, principal must be positive")]
    InvalidPrincipal {
        principal: Money,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("invalid payment week {week_number} on loan {loan_id}: term is {term_weeks} weeks")]
    InvalidPaymentWeek {
        loan_id: LoanId,
        week_number: i64,
        term_weeks: u32,
    },

    #[error("invalid payment amount {amount} on loan {loan_id}")]
    InvalidPaymentAmount {
        loan_id: LoanId,
        amount: Money,
    },

    #[error("duplicate payment for week {week_number} on loan {loan_id}")]
    DuplicatePaymentWeek {
        loan_id: LoanId,
        week_number: u32,
    },

    #[error("malformed record at index {index}: {reason}")]
    MalformedRecord {
        index: usize,
        reason: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LendingError>;
