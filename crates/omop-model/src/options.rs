//! Configuration options for an ETL run.

use serde::{Deserialize, Serialize};

/// Default gap tolerance between events of the same era.
pub const DEFAULT_GAP_DAYS: u32 = 30;

/// Default duration assigned to events without an end date or days supply.
pub const DEFAULT_MIN_DURATION_DAYS: u32 = 1;

/// Parameters of the era consolidation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraOptions {
    /// Maximum silence between two events before they start separate eras.
    pub gap_days: u32,
    /// Duration applied when an event has neither an end date nor a days supply.
    pub min_duration_days: u32,
}

impl Default for EraOptions {
    fn default() -> Self {
        Self {
            gap_days: DEFAULT_GAP_DAYS,
            min_duration_days: DEFAULT_MIN_DURATION_DAYS,
        }
    }
}

impl EraOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_gap_days(mut self, gap_days: u32) -> Self {
        self.gap_days = gap_days;
        self
    }

    #[must_use]
    pub fn with_min_duration_days(mut self, days: u32) -> Self {
        self.min_duration_days = days;
        self
    }
}

/// Whether a run keeps its writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Commit the enclosing transaction when every step succeeds.
    #[default]
    Commit,
    /// Execute every step, then roll back regardless of the outcome.
    DryRun,
}

/// Options controlling an ETL run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtlOptions {
    pub era: EraOptions,
    pub run_mode: RunMode,
}

impl EtlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_era(mut self, era: EraOptions) -> Self {
        self.era = era;
        self
    }

    #[must_use]
    pub fn with_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }
}
