use serde::{Deserialize, Serialize};

use crate::calculator::{loan_installment, payment_for_week};
use crate::decimal::Money;
use crate::errors::Result;
use crate::types::{Loan, LoanRole};
use crate::warnings::WarningSink;

/// how weeks without a recorded payment are valued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesMode {
    /// every unpaid week counts the scheduled installment
    #[default]
    Projection,
    /// weeks up to `as_of_week` count only recorded payments; later weeks
    /// fall back to the scheduled installment
    ActualsToDate { as_of_week: u32 },
}

/// cash flow for a single week
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    pub week: u32,
    pub projected_incoming: Money,
    pub projected_payouts: Money,
    pub net: Money,
}

/// running totals through a week
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub week: u32,
    pub cumulative_incoming: Money,
    pub cumulative_payouts: Money,
    pub cumulative_net: Money,
}

/// week-by-week projected cash flow, indexed `1..=max term`
pub fn weekly_series(loans: &[Loan]) -> Result<Vec<WeeklyPoint>> {
    weekly_series_with(loans, SeriesMode::Projection, &mut WarningSink::new())
}

pub fn weekly_series_with(
    loans: &[Loan],
    mode: SeriesMode,
    warnings: &mut WarningSink,
) -> Result<Vec<WeeklyPoint>> {
    // terms are validated here, before any week buckets are allocated
    let installments = loans.iter().map(loan_installment).collect::<Result<Vec<_>>>()?;

    let max_term = loans.iter().map(|l| l.term_weeks).max().unwrap_or(0);
    let mut incoming = vec![Money::ZERO; max_term as usize];
    let mut payouts = vec![Money::ZERO; max_term as usize];

    tracing::debug!(loans = loans.len(), weeks = max_term, ?mode, "building weekly series");

    for (loan, installment) in loans.iter().zip(installments) {
        let bucket = match loan.role {
            LoanRole::Owned => &mut incoming,
            LoanRole::Owed => &mut payouts,
        };

        for week in 1..=loan.term_weeks {
            let amount = week_amount(loan, week, installment, mode, warnings);
            let slot = &mut bucket[(week - 1) as usize];
            *slot = slot.checked_add(amount)?;
        }
    }

    incoming
        .into_iter()
        .zip(payouts)
        .enumerate()
        .map(|(i, (projected_incoming, projected_payouts))| {
            Ok(WeeklyPoint {
                week: i as u32 + 1,
                projected_incoming,
                projected_payouts,
                net: projected_incoming.checked_sub(projected_payouts)?,
            })
        })
        .collect()
}

/// the contribution of one loan to one week
fn week_amount(
    loan: &Loan,
    week: u32,
    installment: Money,
    mode: SeriesMode,
    warnings: &mut WarningSink,
) -> Money {
    let recorded = payment_for_week(loan, week, warnings).map(|p| p.amount);

    match (recorded, mode) {
        (Some(amount), _) => amount,
        (None, SeriesMode::ActualsToDate { as_of_week }) if week <= as_of_week => Money::ZERO,
        (None, _) => installment,
    }
}

/// running totals of [`weekly_series`]
pub fn cumulative_weekly_series(loans: &[Loan]) -> Result<Vec<CumulativePoint>> {
    cumulative_weekly_series_with(loans, SeriesMode::Projection, &mut WarningSink::new())
}

pub fn cumulative_weekly_series_with(
    loans: &[Loan],
    mode: SeriesMode,
    warnings: &mut WarningSink,
) -> Result<Vec<CumulativePoint>> {
    let weekly = weekly_series_with(loans, mode, warnings)?;

    let mut cumulative_incoming = Money::ZERO;
    let mut cumulative_payouts = Money::ZERO;
    let mut points = Vec::with_capacity(weekly.len());

    for point in weekly {
        cumulative_incoming = cumulative_incoming.checked_add(point.projected_incoming)?;
        cumulative_payouts = cumulative_payouts.checked_add(point.projected_payouts)?;
        points.push(CumulativePoint {
            week: point.week,
            cumulative_incoming,
            cumulative_payouts,
            cumulative_net: cumulative_incoming.checked_sub(cumulative_payouts)?,
        });
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::warnings::Warning;

    fn loan(id: &str, principal: i64, term: u32, role: LoanRole) -> Loan {
        Loan::new(id, Money::from_major(principal), Rate::ZERO, term, role).unwrap()
    }

    #[test]
    fn test_empty_collection_has_no_weeks() {
        assert!(weekly_series(&[]).unwrap().is_empty());
        assert!(cumulative_weekly_series(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_shorter_loan_stops_contributing() {
        let loans = vec![
            loan("lent", 1_200, 12, LoanRole::Owned),
            loan("borrowed", 800, 8, LoanRole::Owed),
        ];
        let series = weekly_series(&loans).unwrap();

        assert_eq!(series.len(), 12);
        assert_eq!(series[0].week, 1);
        assert_eq!(series[0].projected_incoming, Money::from_major(100));
        assert_eq!(series[0].projected_payouts, Money::from_major(100));
        assert_eq!(series[0].net, Money::ZERO);

        for point in &series[8..] {
            assert_eq!(point.projected_payouts, Money::ZERO);
            assert_eq!(point.net, Money::from_major(100));
        }
    }

    #[test]
    fn test_recorded_payment_replaces_installment() {
        let mut lent = loan("lent", 400, 4, LoanRole::Owned);
        lent.payments_made.push(crate::types::Payment::new(2, Money::from_major(150)));
        let series = weekly_series(&[lent]).unwrap();

        let incoming: Vec<Money> = series.iter().map(|p| p.projected_incoming).collect();
        assert_eq!(
            incoming,
            vec![Money::from_major(100), Money::from_major(150), Money::from_major(100), Money::from_major(100)]
        );
    }

    #[test]
    fn test_actuals_to_date_zeroes_unpaid_past_weeks() {
        let mut lent = loan("lent", 400, 4, LoanRole::Owned);
        lent.payments_made.push(crate::types::Payment::new(1, Money::from_major(100)));

        let mut sink = WarningSink::new();
        let series =
            weekly_series_with(&[lent], SeriesMode::ActualsToDate { as_of_week: 2 }, &mut sink).unwrap();

        assert_eq!(series[0].projected_incoming, Money::from_major(100));
        assert_eq!(series[1].projected_incoming, Money::ZERO);
        assert_eq!(series[2].projected_incoming, Money::from_major(100));
    }

    #[test]
    fn test_cumulative_running_totals() {
        let loans = vec![
            loan("lent", 1_200, 12, LoanRole::Owned),
            loan("borrowed", 800, 8, LoanRole::Owed),
        ];
        let series = cumulative_weekly_series(&loans).unwrap();

        assert_eq!(series.len(), 12);
        assert_eq!(series[7].cumulative_payouts, Money::from_major(800));
        assert_eq!(series[11].cumulative_payouts, Money::from_major(800));
        assert_eq!(series[11].cumulative_incoming, Money::from_major(1_200));
        assert_eq!(series[11].cumulative_net, Money::from_major(400));

        for pair in series.windows(2) {
            assert!(pair[1].cumulative_incoming >= pair[0].cumulative_incoming);
            assert!(pair[1].cumulative_payouts >= pair[0].cumulative_payouts);
        }
    }

    #[test]
    fn test_duplicate_week_warns_during_series() {
        let mut lent = loan("lent", 400, 4, LoanRole::Owned);
        lent.payments_made.push(crate::types::Payment::new(3, Money::from_major(90)));
        lent.payments_made.push(crate::types::Payment::new(3, Money::from_major(110)));

        let mut sink = WarningSink::new();
        let series = weekly_series_with(&[lent], SeriesMode::Projection, &mut sink).unwrap();

        assert_eq!(series[2].projected_incoming, Money::from_major(90));
        assert!(matches!(sink.warnings(), [Warning::DuplicateWeek { week_number: 3, .. }]));
    }

    #[test]
    fn test_invalid_term_fails_series() {
        let mut lent = loan("lent", 400, 4, LoanRole::Owned);
        lent.term_weeks = 0;
        assert!(weekly_series(&[lent]).is_err());
    }

    #[test]
    fn test_oversized_term_fails_before_allocating() {
        let mut lent = loan("lent", 400, 4, LoanRole::Owned);
        lent.term_weeks = u32::MAX;
        let borrowed = loan("borrowed", 100, 2, LoanRole::Owed);

        assert!(matches!(
            weekly_series(&[borrowed, lent]),
            Err(crate::errors::LendingError::InvalidTerm { .. })
        ));
    }
}
