use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::event::EraKey;

/// A consolidated span of continuous exposure or condition presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Era {
    /// Dense surrogate key, unique within one era table.
    pub era_id: i64,
    pub subject_id: i64,
    pub concept_id: i64,
    pub era_start_date: NaiveDate,
    pub era_end_date: NaiveDate,
    /// Number of source events merged into this era.
    pub occurrence_count: u32,
    /// Gap tolerance the era was built with.
    pub gap_days: u32,
}

impl Era {
    pub fn key(&self) -> EraKey {
        EraKey {
            subject_id: self.subject_id,
            concept_id: self.concept_id,
        }
    }

    /// Length of the era in days (zero for single-day eras).
    pub fn duration_days(&self) -> i64 {
        (self.era_end_date - self.era_start_date).num_days()
    }
}
