pub mod calculator;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod portfolio;
pub mod snapshot;
pub mod types;
pub mod warnings;

// re-export key types
pub use calculator::{
    is_complete, is_complete_by, is_paid_off, remaining_balance, total_interest, total_paid,
    total_scheduled_repayment, weekly_installment, LoanMetrics, LoanProgress, RepaymentSchedule,
    ScheduledInstallment,
};
pub use config::{DuplicatePolicy, EngineConfig, SnapshotConfig};
pub use decimal::{Money, Rate};
pub use engine::LendingEngine;
pub use errors::{LendingError, Result};
pub use portfolio::{
    average_interest_rate, cumulative_weekly_series, net_position, portfolio_summary,
    sum_principal, total_interest_across_loans, weekly_series, CumulativePoint, PortfolioSummary,
    SeriesMode, WeeklyPoint,
};
pub use snapshot::{QuarantinedRecord, SnapshotIngest};
pub use types::{CompletionBasis, Loan, LoanBuilder, LoanId, LoanRole, Payment, MAX_TERM_WEEKS};
pub use warnings::{Warning, WarningSink};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
