use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::LoanId;

/// non-fatal conditions surfaced while computing over a loan snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// more than one payment recorded for the same week; the first one wins
    DuplicateWeek {
        loan_id: LoanId,
        week_number: u32,
        kept_amount: Money,
        ignored_amount: Money,
    },
    /// a snapshot record could not be coerced into a loan
    RecordQuarantined {
        index: usize,
        loan_id: Option<String>,
        reason: String,
    },
    /// recorded payments exceed the principal
    Overpaid {
        loan_id: LoanId,
        excess: Money,
    },
    /// a summary field could not be computed and was reported as zero
    FieldDegraded {
        field: String,
        reason: String,
    },
}

/// collects warnings during engine operations
#[derive(Debug, Default)]
pub struct WarningSink {
    warnings: Vec<Warning>,
}

impl WarningSink {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// record a warning and log it
    pub fn emit(&mut self, warning: Warning) {
        match &warning {
            Warning::DuplicateWeek { loan_id, week_number, kept_amount, ignored_amount } => {
                tracing::warn!(
                    loan_id = %loan_id,
                    week_number,
                    kept = %kept_amount,
                    ignored = %ignored_amount,
                    "duplicate payment week"
                );
            }
            Warning::RecordQuarantined { index, loan_id, reason } => {
                tracing::warn!(index, loan_id = ?loan_id, reason = %reason, "snapshot record quarantined");
            }
            Warning::Overpaid { loan_id, excess } => {
                tracing::warn!(loan_id = %loan_id, excess = %excess, "loan overpaid");
            }
            Warning::FieldDegraded { field, reason } => {
                tracing::warn!(field = %field, reason = %reason, "summary field degraded to zero");
            }
        }
        self.warnings.push(warning);
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn clear(&mut self) {
        self.warnings.clear();
    }
}
