use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::calculator::{is_complete, is_paid_off, payments_remaining, remaining_balance};
use crate::decimal::Money;
use crate::errors::Result;
use crate::types::{Loan, LoanId};

/// where a loan stands against its weekly calendar at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProgress {
    pub loan_id: LoanId,
    pub as_of: DateTime<Utc>,
    /// due dates already passed, capped at the term
    pub weeks_elapsed: u32,
    pub payments_recorded: u32,
    pub payments_remaining: u32,
    /// elapsed weeks with no recorded payment
    pub missed_weeks: Vec<u32>,
    /// earliest week with no recorded payment
    pub next_due_week: Option<u32>,
    pub next_due_date: Option<DateTime<Utc>>,
    pub remaining_balance: Money,
    pub is_complete: bool,
    pub is_paid_off: bool,
}

impl LoanProgress {
    /// compute progress at the provider's current time
    ///
    /// Loans without a start date have no calendar: nothing has elapsed and
    /// no due date is reported.
    pub fn compute(loan: &Loan, time_provider: &SafeTimeProvider) -> Result<Self> {
        let now = time_provider.now();
        let complete = is_complete(loan)?;
        let weeks_elapsed = weeks_elapsed(loan, now);

        let has_payment = |week: u32| loan.payments_made.iter().any(|p| p.week_number == week);

        let missed_weeks: Vec<u32> = (1..=weeks_elapsed).filter(|w| !has_payment(*w)).collect();
        let next_due_week = (1..=loan.term_weeks).find(|w| !has_payment(*w));
        let next_due_date = match next_due_week {
            Some(week) => loan.due_date(week)?,
            None => None,
        };

        Ok(Self {
            loan_id: loan.id.clone(),
            as_of: now,
            weeks_elapsed,
            payments_recorded: u32::try_from(loan.payments_made.len()).unwrap_or(u32::MAX),
            payments_remaining: payments_remaining(loan),
            missed_weeks,
            next_due_week,
            next_due_date,
            remaining_balance: remaining_balance(loan)?,
            is_complete: complete,
            is_paid_off: is_paid_off(loan)?,
        })
    }

    pub fn is_behind(&self) -> bool {
        !self.missed_weeks.is_empty()
    }
}

/// whole weeks between the loan start and `now`, capped at the term
pub fn weeks_elapsed(loan: &Loan, now: DateTime<Utc>) -> u32 {
    let Some(start) = loan.start_date else {
        return 0;
    };
    if now <= start {
        return 0;
    }

    let weeks = (now - start).num_weeks();
    u32::try_from(weeks).unwrap_or(u32::MAX).min(loan.term_weeks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::errors::LendingError;
    use crate::types::LoanRole;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;

    fn started_loan(start: DateTime<Utc>) -> Loan {
        Loan::builder()
            .id("p")
            .principal(Money::from_major(1_000))
            .term_weeks(10)
            .owed()
            .payment(1, Money::from_major(100))
            .payment(3, Money::from_major(100))
            .start_date(start)
            .build()
            .unwrap()
    }

    #[test]
    fn test_progress_tracks_missed_weeks() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start));
        let control = time.test_control().unwrap();
        let loan = started_loan(start);

        let progress = LoanProgress::compute(&loan, &time).unwrap();
        assert_eq!(progress.weeks_elapsed, 0);
        assert!(!progress.is_behind());
        assert_eq!(progress.next_due_week, Some(2));
        assert_eq!(progress.next_due_date, Some(start + Duration::weeks(2)));

        control.advance(Duration::days(30));
        let progress = LoanProgress::compute(&loan, &time).unwrap();
        assert_eq!(progress.weeks_elapsed, 4);
        assert_eq!(progress.missed_weeks, vec![2, 4]);
        assert_eq!(progress.payments_recorded, 2);
        assert_eq!(progress.payments_remaining, 8);
        assert_eq!(progress.remaining_balance, Money::from_major(800));
        assert!(progress.is_behind());
    }

    #[test]
    fn test_elapsed_weeks_capped_at_term() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start));
        let control = time.test_control().unwrap();
        let loan = started_loan(start);

        control.advance(Duration::weeks(40));
        let progress = LoanProgress::compute(&loan, &time).unwrap();
        assert_eq!(progress.weeks_elapsed, 10);
        assert_eq!(progress.missed_weeks.len(), 8);
    }

    #[test]
    fn test_no_start_date_means_no_calendar() {
        let loan = Loan::builder()
            .id("p")
            .principal(Money::from_major(100))
            .term_weeks(4)
            .owned()
            .build()
            .unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));

        let progress = LoanProgress::compute(&loan, &time).unwrap();
        assert_eq!(progress.weeks_elapsed, 0);
        assert_eq!(progress.next_due_week, Some(1));
        assert_eq!(progress.next_due_date, None);
    }

    #[test]
    fn test_due_date_out_of_range_is_an_error() {
        let start = DateTime::<Utc>::MAX_UTC - Duration::days(3);
        let time = SafeTimeProvider::new(TimeSource::Test(start));
        let mut loan = Loan::new("p", Money::from_major(100), Rate::ZERO, 4, LoanRole::Owed).unwrap();
        loan.start_date = Some(start);

        let err = LoanProgress::compute(&loan, &time).unwrap_err();
        assert!(matches!(err, LendingError::CalculationError { .. }));
    }
}
