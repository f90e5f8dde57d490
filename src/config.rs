use serde::{Deserialize, Serialize};

use crate::errors::{LendingError, Result};
use crate::portfolio::SeriesMode;
use crate::types::{CompletionBasis, MAX_TERM_WEEKS};

/// longest term accepted from a snapshot by default (ten years)
pub const DEFAULT_MAX_TERM_WEEKS: u32 = 520;

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub completion_basis: CompletionBasis,
    pub series_mode: SeriesMode,
    pub duplicate_policy: DuplicatePolicy,
    pub snapshot: SnapshotConfig,
}

/// what to do when a loan records two payments for one week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// keep the first payment and emit a warning
    #[default]
    Warn,
    /// fail the operation
    Reject,
}

/// snapshot ingest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// set malformed records aside instead of failing the whole snapshot
    pub quarantine_malformed: bool,
    /// records with a longer term are treated as malformed
    pub max_term_weeks: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            quarantine_malformed: true,
            max_term_weeks: DEFAULT_MAX_TERM_WEEKS,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::dashboard()
    }
}

impl EngineConfig {
    /// lenient settings for live dashboards
    pub fn dashboard() -> Self {
        Self {
            completion_basis: CompletionBasis::PaymentCount,
            series_mode: SeriesMode::Projection,
            duplicate_policy: DuplicatePolicy::Warn,
            snapshot: SnapshotConfig::default(),
        }
    }

    /// fail on any data-integrity problem
    pub fn strict() -> Self {
        Self {
            completion_basis: CompletionBasis::Balance,
            series_mode: SeriesMode::Projection,
            duplicate_policy: DuplicatePolicy::Reject,
            snapshot: SnapshotConfig {
                quarantine_malformed: false,
                max_term_weeks: DEFAULT_MAX_TERM_WEEKS,
            },
        }
    }

    /// parse and validate a json configuration; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.snapshot.max_term_weeks == 0 || self.snapshot.max_term_weeks > MAX_TERM_WEEKS {
            return Err(LendingError::InvalidConfiguration {
                message: format!(
                    "snapshot.max_term_weeks must be between 1 and {}, got {}",
                    MAX_TERM_WEEKS, self.snapshot.max_term_weeks
                ),
            });
        }

        if let SeriesMode::ActualsToDate { as_of_week } = self.series_mode {
            if as_of_week > self.snapshot.max_term_weeks {
                return Err(LendingError::InvalidConfiguration {
                    message: format!(
                        "series as_of_week {} is beyond the longest accepted term of {} weeks",
                        as_of_week, self.snapshot.max_term_weeks
                    ),
                });
            }
        }

        Ok(())
    }
}
