pub mod series;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculator::{remaining_balance, total_interest, total_paid, total_scheduled_repayment};
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::types::{Loan, LoanRole};
use crate::warnings::{Warning, WarningSink};

pub use series::{
    cumulative_weekly_series, cumulative_weekly_series_with, weekly_series, weekly_series_with,
    CumulativePoint, SeriesMode, WeeklyPoint,
};

/// loans where the viewer is the lender
pub fn owned<'a, I>(loans: I) -> impl Iterator<Item = &'a Loan>
where
    I: IntoIterator<Item = &'a Loan>,
{
    loans.into_iter().filter(|l| l.role == LoanRole::Owned)
}

/// loans where the viewer is the borrower
pub fn owed<'a, I>(loans: I) -> impl Iterator<Item = &'a Loan>
where
    I: IntoIterator<Item = &'a Loan>,
{
    loans.into_iter().filter(|l| l.role == LoanRole::Owed)
}

pub fn sum_principal<'a, I>(loans: I) -> Result<Money>
where
    I: IntoIterator<Item = &'a Loan>,
{
    Money::checked_sum(loans.into_iter().map(|l| l.principal_amount))
}

/// mean annual rate; zero for an empty collection
pub fn average_interest_rate<'a, I>(loans: I) -> Rate
where
    I: IntoIterator<Item = &'a Loan>,
{
    let (sum, count) = loans
        .into_iter()
        .fold((Decimal::ZERO, 0u64), |(sum, count), l| {
            (sum + l.interest_rate.as_percent(), count + 1)
        });

    if count == 0 {
        return Rate::ZERO;
    }
    Rate::from_percent(sum / Decimal::from(count))
}

pub fn total_interest_across_loans<'a, I>(loans: I) -> Result<Money>
where
    I: IntoIterator<Item = &'a Loan>,
{
    try_sum(loans, total_interest)
}

pub fn total_scheduled_across_loans<'a, I>(loans: I) -> Result<Money>
where
    I: IntoIterator<Item = &'a Loan>,
{
    try_sum(loans, total_scheduled_repayment)
}

/// lent minus borrowed
pub fn net_position(owned_total: Money, owed_total: Money) -> Result<Money> {
    owned_total.checked_sub(owed_total)
}

fn try_sum<'a, I, F>(loans: I, f: F) -> Result<Money>
where
    I: IntoIterator<Item = &'a Loan>,
    F: Fn(&Loan) -> Result<Money>,
{
    loans
        .into_iter()
        .try_fold(Money::ZERO, |acc, loan| acc.checked_add(f(loan)?))
}

/// dashboard figures for a loan collection, partitioned by role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PortfolioSummary {
    pub owned_count: usize,
    pub owed_count: usize,
    /// principal lent
    pub total_owned: Money,
    /// principal borrowed
    pub total_owed: Money,
    pub net_position: Money,
    pub interest_expected: Money,
    pub interest_payable: Money,
    pub scheduled_repayment_owned: Money,
    pub scheduled_repayment_owed: Money,
    pub average_rate_owned: Rate,
    pub average_rate_owed: Rate,
    /// interest across every loan regardless of role
    pub total_reserves: Money,
    pub received_to_date: Money,
    pub paid_to_date: Money,
    pub outstanding_owned: Money,
    pub outstanding_owed: Money,
    /// fields that failed to compute and were reported as zero
    pub degraded_fields: Vec<String>,
}

impl PortfolioSummary {
    pub fn is_degraded(&self) -> bool {
        !self.degraded_fields.is_empty()
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// summarize a loan collection
///
/// Failures in one field do not fail the call; see [`portfolio_summary_with`].
pub fn portfolio_summary(loans: &[Loan]) -> PortfolioSummary {
    portfolio_summary_with(loans, &mut WarningSink::new())
}

/// summarize a loan collection, reporting degraded fields to `warnings`
///
/// Every field is computed on its own. A field whose computation fails (for
/// instance a loan with an invalid term) is set to zero, named in
/// `degraded_fields`, and reported as a [`Warning::FieldDegraded`].
pub fn portfolio_summary_with(loans: &[Loan], warnings: &mut WarningSink) -> PortfolioSummary {
    let owned_loans: Vec<&Loan> = owned(loans).collect();
    let owed_loans: Vec<&Loan> = owed(loans).collect();

    tracing::debug!(
        owned = owned_loans.len(),
        owed = owed_loans.len(),
        "summarizing portfolio"
    );

    let mut degraded = Vec::new();
    let mut field = |name: &str, value: Result<Money>| -> Money {
        value.unwrap_or_else(|e| {
            warnings.emit(Warning::FieldDegraded {
                field: name.to_string(),
                reason: e.to_string(),
            });
            degraded.push(name.to_string());
            Money::ZERO
        })
    };

    let total_owned = field("total_owned", sum_principal(owned_loans.iter().copied()));
    let total_owed = field("total_owed", sum_principal(owed_loans.iter().copied()));
    let net = field("net_position", net_position(total_owned, total_owed));

    let interest_expected = field("interest_expected", total_interest_across_loans(owned_loans.iter().copied()));
    let interest_payable = field("interest_payable", total_interest_across_loans(owed_loans.iter().copied()));
    let scheduled_repayment_owned =
        field("scheduled_repayment_owned", total_scheduled_across_loans(owned_loans.iter().copied()));
    let scheduled_repayment_owed =
        field("scheduled_repayment_owed", total_scheduled_across_loans(owed_loans.iter().copied()));
    let total_reserves = field("total_reserves", total_interest_across_loans(loans));
    let received_to_date = field("received_to_date", try_sum(owned_loans.iter().copied(), total_paid));
    let paid_to_date = field("paid_to_date", try_sum(owed_loans.iter().copied(), total_paid));
    let outstanding_owned =
        field("outstanding_owned", try_sum(owned_loans.iter().copied(), remaining_balance));
    let outstanding_owed = field("outstanding_owed", try_sum(owed_loans.iter().copied(), remaining_balance));

    PortfolioSummary {
        owned_count: owned_loans.len(),
        owed_count: owed_loans.len(),
        total_owned,
        total_owed,
        net_position: net,
        interest_expected,
        interest_payable,
        scheduled_repayment_owned,
        scheduled_repayment_owed,
        average_rate_owned: average_interest_rate(owned_loans.iter().copied()),
        average_rate_owed: average_interest_rate(owed_loans.iter().copied()),
        total_reserves,
        received_to_date,
        paid_to_date,
        outstanding_owned,
        outstanding_owed,
        degraded_fields: degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn loan(id: &str, principal: i64, rate: u32, term: u32, role: LoanRole) -> Loan {
        Loan::new(id, Money::from_major(principal), Rate::from_percentage(rate), term, role).unwrap()
    }

    fn book() -> Vec<Loan> {
        vec![
            loan("a", 5_000, 5, 52, LoanRole::Owned),
            loan("b", 1_200, 0, 12, LoanRole::Owned),
            loan("c", 3_000, 0, 26, LoanRole::Owed),
        ]
    }

    #[test]
    fn test_role_filters() {
        let loans = book();
        assert_eq!(owned(&loans).count(), 2);
        assert_eq!(owed(&loans).count(), 1);
        assert_eq!(sum_principal(owned(&loans)).unwrap(), Money::from_major(6_200));
        assert_eq!(sum_principal(&loans).unwrap(), Money::from_major(9_200));
    }

    #[test]
    fn test_average_rate() {
        let loans = book();
        assert_eq!(average_interest_rate(owned(&loans)).as_percent(), dec!(2.5));
        assert_eq!(average_interest_rate(owed(&loans)), Rate::ZERO);
        assert_eq!(average_interest_rate(&Vec::<Loan>::new()), Rate::ZERO);
    }

    #[test]
    fn test_net_position() {
        assert_eq!(
            net_position(Money::from_major(500), Money::from_major(800)).unwrap(),
            Money::from_major(-300)
        );
    }

    #[test]
    fn test_summary_fields() {
        let loans = book();
        let summary = portfolio_summary(&loans);

        assert_eq!(summary.owned_count, 2);
        assert_eq!(summary.owed_count, 1);
        assert_eq!(summary.total_owned, Money::from_major(6_200));
        assert_eq!(summary.total_owed, Money::from_major(3_000));
        assert_eq!(summary.net_position, Money::from_major(3_200));
        assert_eq!(summary.interest_expected, Money::from_minor(12824));
        assert_eq!(summary.interest_payable, Money::from_minor(-12));
        assert_eq!(summary.scheduled_repayment_owned, Money::from_minor(632824));
        assert_eq!(summary.scheduled_repayment_owed, Money::from_minor(299988));
        assert_eq!(summary.total_reserves, Money::from_minor(12812));
        assert_eq!(summary.outstanding_owned, Money::from_major(6_200));
        assert!(!summary.is_degraded());
    }

    #[test]
    fn test_summary_is_pure() {
        let loans = book();
        assert_eq!(portfolio_summary(&loans), portfolio_summary(&loans));
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = portfolio_summary(&[]);
        assert_eq!(summary, PortfolioSummary::default());
    }

    #[test]
    fn test_invalid_loan_degrades_only_its_fields() {
        let mut broken = loan("x", 1_000, 10, 10, LoanRole::Owed);
        broken.term_weeks = 0;
        let loans = vec![loan("a", 5_000, 5, 52, LoanRole::Owned), broken];

        let mut sink = WarningSink::new();
        let summary = portfolio_summary_with(&loans, &mut sink);

        assert_eq!(summary.interest_expected, Money::from_minor(12824));
        assert_eq!(summary.interest_payable, Money::ZERO);
        assert_eq!(summary.total_reserves, Money::ZERO);
        assert_eq!(summary.total_owed, Money::from_major(1_000));
        assert_eq!(
            summary.degraded_fields,
            vec!["interest_payable", "scheduled_repayment_owed", "total_reserves"]
        );
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_principal_overflow_degrades_instead_of_panicking() {
        let half = Money::from_decimal(Decimal::MAX / dec!(2) + Decimal::ONE);
        let loans = vec![
            Loan::new("big-1", half, Rate::ZERO, 1, LoanRole::Owned).unwrap(),
            Loan::new("big-2", half, Rate::ZERO, 1, LoanRole::Owned).unwrap(),
            loan("small", 300, 0, 3, LoanRole::Owed),
        ];

        let mut sink = WarningSink::new();
        let summary = portfolio_summary_with(&loans, &mut sink);

        assert_eq!(summary.total_owned, Money::ZERO);
        assert_eq!(summary.total_owed, Money::from_major(300));
        assert_eq!(summary.outstanding_owed, Money::from_major(300));
        assert!(summary.degraded_fields.contains(&"total_owned".to_string()));
        assert!(summary.degraded_fields.contains(&"outstanding_owned".to_string()));
        assert!(!summary.degraded_fields.contains(&"total_owed".to_string()));
        assert_eq!(sink.len(), summary.degraded_fields.len());
        assert!(sum_principal(&loans).is_err());
    }
}
