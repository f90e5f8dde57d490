use hourglass_rs::SafeTimeProvider;

use crate::calculator::{
    duplicate_weeks, is_complete_by, overpayment, LoanMetrics, LoanProgress, RepaymentSchedule,
};
use crate::config::{DuplicatePolicy, EngineConfig};
use crate::errors::{LendingError, Result};
use crate::portfolio::{
    cumulative_weekly_series_with, portfolio_summary_with, weekly_series_with, CumulativePoint,
    PortfolioSummary, WeeklyPoint,
};
use crate::snapshot::{ingest_json, ingest_value, SnapshotIngest};
use crate::types::Loan;
use crate::warnings::{Warning, WarningSink};

/// entry point for presentation callers
///
/// Holds configuration and a warning sink; every computation is delegated to
/// the pure functions in [`crate::calculator`] and [`crate::portfolio`], so
/// the engine keeps no loan state between calls.
#[derive(Debug, Default)]
pub struct LendingEngine {
    pub config: EngineConfig,
    pub warnings: WarningSink,
}

impl LendingEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            warnings: WarningSink::new(),
        })
    }

    /// coerce snapshot text from the document store
    pub fn ingest(&mut self, json: &str, viewer_id: Option<&str>) -> Result<SnapshotIngest> {
        ingest_json(json, viewer_id, &self.config.snapshot, &mut self.warnings)
    }

    pub fn ingest_value(
        &mut self,
        snapshot: &serde_json::Value,
        viewer_id: Option<&str>,
    ) -> Result<SnapshotIngest> {
        ingest_value(snapshot, viewer_id, &self.config.snapshot, &mut self.warnings)
    }

    /// dashboard summary for a loan collection
    pub fn summary(&mut self, loans: &[Loan]) -> Result<PortfolioSummary> {
        self.check_integrity(loans)?;
        Ok(portfolio_summary_with(loans, &mut self.warnings))
    }

    pub fn weekly_series(&mut self, loans: &[Loan]) -> Result<Vec<WeeklyPoint>> {
        self.check_integrity(loans)?;
        weekly_series_with(loans, self.config.series_mode, &mut self.warnings)
    }

    pub fn cumulative_series(&mut self, loans: &[Loan]) -> Result<Vec<CumulativePoint>> {
        self.check_integrity(loans)?;
        cumulative_weekly_series_with(loans, self.config.series_mode, &mut self.warnings)
    }

    pub fn metrics(&mut self, loan: &Loan) -> Result<LoanMetrics> {
        self.check_integrity(std::slice::from_ref(loan))?;
        LoanMetrics::compute(loan)
    }

    pub fn schedule(&mut self, loan: &Loan) -> Result<RepaymentSchedule> {
        self.check_integrity(std::slice::from_ref(loan))?;
        RepaymentSchedule::generate(loan, &mut self.warnings)
    }

    pub fn progress(&mut self, loan: &Loan, time_provider: &SafeTimeProvider) -> Result<LoanProgress> {
        self.check_integrity(std::slice::from_ref(loan))?;
        LoanProgress::compute(loan, time_provider)
    }

    /// completion under the configured basis
    pub fn is_complete(&self, loan: &Loan) -> Result<bool> {
        is_complete_by(loan, self.config.completion_basis)
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        self.warnings.take_warnings()
    }

    /// apply the duplicate policy and flag overpaid loans
    fn check_integrity(&mut self, loans: &[Loan]) -> Result<()> {
        for loan in loans {
            if self.config.duplicate_policy == DuplicatePolicy::Reject {
                if let Some(&week_number) = duplicate_weeks(loan).first() {
                    return Err(LendingError::DuplicatePaymentWeek {
                        loan_id: loan.id.clone(),
                        week_number,
                    });
                }
            }

            // an unsummable payment list is reported by the computation itself
            if let Ok(Some(excess)) = overpayment(loan) {
                self.warnings.emit(Warning::Overpaid {
                    loan_id: loan.id.clone(),
                    excess,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::types::{CompletionBasis, LoanRole};

    const SNAPSHOT: &str = r#"[
        { "id": "a", "principalAmount": 1200, "interestRate": 0, "termWeeks": 12, "role": "owned",
          "paymentsMade": [ { "weekNumber": 1, "amount": 100 }, { "weekNumber": 1, "amount": 100 } ] },
        { "id": "b", "principalAmount": 800, "interestRate": 0, "termWeeks": 8, "role": "owed" },
        { "id": "c", "principalAmount": "oops", "interestRate": 0, "termWeeks": 8, "role": "owed" }
    ]"#;

    #[test]
    fn test_ingest_then_summarize() {
        let mut engine = LendingEngine::new(EngineConfig::dashboard()).unwrap();
        let ingest = engine.ingest(SNAPSHOT, None).unwrap();
        assert_eq!(ingest.loans.len(), 2);
        assert_eq!(ingest.quarantined.len(), 1);

        let summary = engine.summary(&ingest.loans).unwrap();
        assert_eq!(summary.net_position, Money::from_major(400));
        assert_eq!(summary.received_to_date, Money::from_major(200));

        let series = engine.weekly_series(&ingest.loans).unwrap();
        assert_eq!(series.len(), 12);

        let warnings = engine.take_warnings();
        assert!(warnings.iter().any(|w| matches!(w, Warning::RecordQuarantined { index: 2, .. })));
        assert!(warnings.iter().any(|w| matches!(w, Warning::DuplicateWeek { week_number: 1, .. })));
        assert!(engine.warnings.is_empty());
    }

    #[test]
    fn test_strict_rejects_duplicates() {
        let mut engine = LendingEngine::new(EngineConfig::strict()).unwrap();
        let loan = Loan::builder()
            .id("d")
            .principal(Money::from_major(300))
            .term_weeks(3)
            .owned()
            .payment(2, Money::from_major(100))
            .payment(2, Money::from_major(100))
            .build()
            .unwrap();

        assert!(matches!(
            engine.summary(&[loan]),
            Err(LendingError::DuplicatePaymentWeek { week_number: 2, .. })
        ));
    }

    #[test]
    fn test_overpaid_loan_warns() {
        let mut engine = LendingEngine::default();
        let loan = Loan::builder()
            .id("o")
            .principal(Money::from_major(100))
            .term_weeks(2)
            .owed()
            .payment(1, Money::from_major(80))
            .payment(2, Money::from_major(80))
            .build()
            .unwrap();

        let metrics = engine.metrics(&loan).unwrap();
        assert_eq!(metrics.remaining_balance, Money::from_major(-60));
        assert!(matches!(engine.warnings.warnings(), [Warning::Overpaid { .. }]));
    }

    #[test]
    fn test_completion_basis_from_config() {
        let loan = Loan::builder()
            .id("c")
            .principal(Money::from_major(1_000))
            .rate(Rate::from_percentage(10))
            .term_weeks(10)
            .role(LoanRole::Owed)
            .payment(1, Money::from_major(1_000))
            .build()
            .unwrap();

        let lenient = LendingEngine::default();
        assert!(!lenient.is_complete(&loan).unwrap());

        let mut config = EngineConfig::default();
        config.completion_basis = CompletionBasis::Balance;
        let by_balance = LendingEngine::new(config).unwrap();
        assert!(by_balance.is_complete(&loan).unwrap());
    }
}
