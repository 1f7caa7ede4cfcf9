//! Clinical events consumed by era consolidation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::tables::{CONDITION_ERA, CONDITION_OCCURRENCE, DRUG_ERA, DRUG_EXPOSURE, TableDef};

/// Source event domain an era table is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EraDomain {
    /// Drug exposures rolled up to RxNorm ingredients.
    Drug,
    /// Condition occurrences.
    Condition,
}

impl EraDomain {
    /// Era domains in the order the default pipeline runs them.
    ///
    /// Differs from declaration order: condition eras are built first.
    pub const ALL: [EraDomain; 2] = [EraDomain::Condition, EraDomain::Drug];

    pub fn as_str(self) -> &'static str {
        match self {
            EraDomain::Drug => "drug",
            EraDomain::Condition => "condition",
        }
    }

    /// Table holding the raw events for this domain.
    pub fn source_table(self) -> &'static TableDef {
        match self {
            EraDomain::Drug => &DRUG_EXPOSURE,
            EraDomain::Condition => &CONDITION_OCCURRENCE,
        }
    }

    /// Table receiving the consolidated eras for this domain.
    pub fn era_table(self) -> &'static TableDef {
        match self {
            EraDomain::Drug => &DRUG_ERA,
            EraDomain::Condition => &CONDITION_ERA,
        }
    }
}

impl fmt::Display for EraDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping key for era consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EraKey {
    pub subject_id: i64,
    pub concept_id: i64,
}

/// Event row as read from the store, before any validation.
///
/// Dates are kept as text so that malformed values can be reported with
/// their row position instead of failing inside the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub subject_id: Option<i64>,
    pub concept_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Duration in days, only populated for drug exposures.
    pub days_supply: Option<i64>,
}

impl RawEvent {
    pub fn new(subject_id: i64, concept_id: i64, start_date: impl Into<String>) -> Self {
        Self {
            subject_id: Some(subject_id),
            concept_id: Some(concept_id),
            start_date: Some(start_date.into()),
            end_date: None,
            days_supply: None,
        }
    }

    #[must_use]
    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    #[must_use]
    pub fn with_days_supply(mut self, days: i64) -> Self {
        self.days_supply = Some(days);
        self
    }
}

/// A validated event with its end date resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Event {
    pub subject_id: i64,
    pub concept_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Event {
    pub fn key(&self) -> EraKey {
        EraKey {
            subject_id: self.subject_id,
            concept_id: self.concept_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_point_at_their_tables() {
        assert_eq!(EraDomain::Drug.source_table().name, "drug_exposure");
        assert_eq!(EraDomain::Drug.era_table().name, "drug_era");
        assert_eq!(EraDomain::Condition.source_table().name, "condition_occurrence");
        assert_eq!(EraDomain::Condition.era_table().name, "condition_era");
    }

    #[test]
    fn all_lists_condition_before_drug() {
        assert_eq!(EraDomain::ALL, [EraDomain::Condition, EraDomain::Drug]);
    }

    #[test]
    fn raw_event_builder_sets_optional_fields() {
        let raw = RawEvent::new(1, 10, "2020-01-01")
            .with_end_date("2020-01-05")
            .with_days_supply(4);
        assert_eq!(raw.end_date.as_deref(), Some("2020-01-05"));
        assert_eq!(raw.days_supply, Some(4));
    }
}
