pub mod progress;
pub mod schedule;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::types::{validate_terms, CompletionBasis, Loan, LoanId, Payment};
use crate::warnings::{Warning, WarningSink};

pub use progress::LoanProgress;
pub use schedule::{RepaymentSchedule, ScheduledInstallment};

/// fixed weekly installment that repays `principal` over `term_weeks`
///
/// Uses the annuity formula `P * r / (1 - (1 + r)^-n)` with
/// `r = annual_rate / 100 / 52`, or `P / n` when the rate is zero. The
/// result is rounded to cents.
pub fn weekly_installment(principal: Money, annual_rate: Rate, term_weeks: u32) -> Result<Money> {
    validate_terms(principal, annual_rate, term_weeks)?;

    let n = Decimal::from(term_weeks);
    let r = annual_rate.weekly_rate();

    if r.is_zero() {
        return Ok((principal / n).round_currency());
    }

    let discount = discount_factor(r, term_weeks);
    let denominator = Decimal::ONE - discount;

    // rate too small to register at decimal precision
    if denominator <= Decimal::ZERO {
        return Ok((principal / n).round_currency());
    }

    let installment = principal
        .as_decimal()
        .checked_mul(r)
        .and_then(|numerator| numerator.checked_div(denominator))
        .ok_or_else(|| LendingError::CalculationError {
            message: format!(
                "installment overflow for principal {} at {} over {} weeks",
                principal, annual_rate, term_weeks
            ),
        })?;

    Ok(Money::from_decimal(installment).round_currency())
}

/// `(1 + r)^-n` by repeated squaring of `1 / (1 + r)`
fn discount_factor(r: Decimal, periods: u32) -> Decimal {
    let mut base = Decimal::ONE / (Decimal::ONE + r);
    let mut result = Decimal::ONE;
    let mut exp = periods;

    while exp > 0 {
        if exp & 1 == 1 {
            result *= base;
        }
        base *= base;
        exp >>= 1;
    }

    result
}

/// weekly installment for a loan's own terms
pub fn loan_installment(loan: &Loan) -> Result<Money> {
    weekly_installment(loan.principal_amount, loan.interest_rate, loan.term_weeks)
}

/// sum of every recorded payment
pub fn total_paid(loan: &Loan) -> Result<Money> {
    Money::checked_sum(loan.payments_made.iter().map(|p| p.amount))
}

/// principal minus payments; negative when overpaid
pub fn remaining_balance(loan: &Loan) -> Result<Money> {
    loan.principal_amount.checked_sub(total_paid(loan)?)
}

/// installment times term
pub fn total_scheduled_repayment(loan: &Loan) -> Result<Money> {
    loan_installment(loan)?.checked_times(loan.term_weeks)
}

/// scheduled repayment minus principal
pub fn total_interest(loan: &Loan) -> Result<Money> {
    total_scheduled_repayment(loan)?.checked_sub(loan.principal_amount)
}

/// true when one payment has been recorded per scheduled week
///
/// Amounts are not reconciled against the schedule: a loan cleared in a
/// single payment is still incomplete, see [`is_paid_off`].
pub fn is_complete(loan: &Loan) -> Result<bool> {
    if loan.term_weeks == 0 {
        return Err(LendingError::InvalidTerm { term_weeks: 0 });
    }
    Ok(loan.payments_made.len() == loan.term_weeks as usize)
}

/// true when the remaining balance is at or below zero
pub fn is_paid_off(loan: &Loan) -> Result<bool> {
    Ok(!remaining_balance(loan)?.is_positive())
}

pub fn is_complete_by(loan: &Loan, basis: CompletionBasis) -> Result<bool> {
    match basis {
        CompletionBasis::PaymentCount => is_complete(loan),
        CompletionBasis::Balance => is_paid_off(loan),
    }
}

/// scheduled weeks still without a recorded payment
pub fn payments_remaining(loan: &Loan) -> u32 {
    let recorded = u32::try_from(loan.payments_made.len()).unwrap_or(u32::MAX);
    loan.term_weeks.saturating_sub(recorded)
}

/// share of scheduled payments recorded, between 0 and 1 unless over-recorded
pub fn progress_ratio(loan: &Loan) -> Result<Decimal> {
    if loan.term_weeks == 0 {
        return Err(LendingError::InvalidTerm { term_weeks: 0 });
    }
    Ok(Decimal::from(loan.payments_made.len() as u64) / Decimal::from(loan.term_weeks))
}

/// excess of payments over principal, if any
pub fn overpayment(loan: &Loan) -> Result<Option<Money>> {
    let balance = remaining_balance(loan)?;
    if balance.is_negative() {
        Ok(Some(-balance))
    } else {
        Ok(None)
    }
}

/// payment recorded for `week`, first match in input order
///
/// Any later payment for the same week is reported to `warnings` and ignored.
pub fn payment_for_week<'a>(
    loan: &'a Loan,
    week: u32,
    warnings: &mut WarningSink,
) -> Option<&'a Payment> {
    let mut matches = loan.payments_made.iter().filter(|p| p.week_number == week);
    let first = matches.next()?;

    for duplicate in matches {
        warnings.emit(Warning::DuplicateWeek {
            loan_id: loan.id.clone(),
            week_number: week,
            kept_amount: first.amount,
            ignored_amount: duplicate.amount,
        });
    }

    Some(first)
}

/// weeks carrying more than one recorded payment, ascending
pub fn duplicate_weeks(loan: &Loan) -> Vec<u32> {
    let mut weeks: Vec<u32> = loan.payments_made.iter().map(|p| p.week_number).collect();
    weeks.sort_unstable();

    let mut duplicates: Vec<u32> = weeks
        .windows(2)
        .filter(|pair| pair[0] == pair[1])
        .map(|pair| pair[0])
        .collect();
    duplicates.dedup();
    duplicates
}

/// derived figures for a single loan, as shown on a loan-detail view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanMetrics {
    pub loan_id: LoanId,
    pub weekly_installment: Money,
    pub total_paid: Money,
    pub remaining_balance: Money,
    pub total_scheduled_repayment: Money,
    pub total_interest: Money,
    pub payments_remaining: u32,
    pub is_complete: bool,
    pub is_paid_off: bool,
}

impl LoanMetrics {
    pub fn compute(loan: &Loan) -> Result<Self> {
        let weekly_installment = loan_installment(loan)?;
        let total_scheduled_repayment = weekly_installment.checked_times(loan.term_weeks)?;

        Ok(Self {
            loan_id: loan.id.clone(),
            weekly_installment,
            total_paid: total_paid(loan)?,
            remaining_balance: remaining_balance(loan)?,
            total_scheduled_repayment,
            total_interest: total_scheduled_repayment.checked_sub(loan.principal_amount)?,
            payments_remaining: payments_remaining(loan),
            is_complete: is_complete(loan)?,
            is_paid_off: is_paid_off(loan)?,
        })
    }
}
