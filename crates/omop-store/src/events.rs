//! Event source queries and era table writes.

use rusqlite::{Connection, params};
use tracing::debug;

use omop_model::{Era, EraDomain, RawEvent};

use crate::error::Result;

/// Drug exposures rolled up to their RxNorm ingredients.
///
/// Exposures without an ingredient ancestor produce no rows.
const DRUG_EVENTS_SQL: &str = "
    SELECT d.person_id,
           c.concept_id,
           d.drug_exposure_start_date,
           d.drug_exposure_end_date,
           d.days_supply
    FROM drug_exposure d
    INNER JOIN concept_ancestor ca ON ca.descendant_concept_id = d.drug_concept_id
    INNER JOIN concept c ON c.concept_id = ca.ancestor_concept_id
    WHERE c.vocabulary_id = 'RxNorm'
      AND c.concept_class_id = 'Ingredient'
    ORDER BY d.drug_exposure_id, c.concept_id";

const CONDITION_EVENTS_SQL: &str = "
    SELECT person_id,
           condition_concept_id,
           condition_start_date,
           condition_end_date,
           NULL
    FROM condition_occurrence
    ORDER BY condition_occurrence_id";

/// Read every raw event of a domain in one set-oriented query.
pub fn read_raw_events(conn: &Connection, domain: EraDomain) -> Result<Vec<RawEvent>> {
    let sql = match domain {
        EraDomain::Drug => DRUG_EVENTS_SQL,
        EraDomain::Condition => CONDITION_EVENTS_SQL,
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(RawEvent {
            subject_id: row.get(0)?,
            concept_id: row.get(1)?,
            start_date: row.get(2)?,
            end_date: row.get(3)?,
            days_supply: row.get(4)?,
        })
    })?;
    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    debug!(domain = %domain, events = events.len(), "read raw events");
    Ok(events)
}

/// Replace the full content of a domain's era table.
///
/// The caller provides the transaction scope; this function never commits.
pub fn replace_eras(conn: &Connection, domain: EraDomain, eras: &[Era]) -> Result<usize> {
    let table = domain.era_table();
    let deleted = conn.execute(&format!("DELETE FROM {}", table.name), [])?;
    debug!(table = table.name, deleted, "cleared era table");

    let columns = table.column_names();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        columns.join(", "),
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    for era in eras {
        stmt.execute(params![
            era.era_id,
            era.subject_id,
            era.concept_id,
            era.era_start_date,
            era.era_end_date,
            era.occurrence_count,
            era.gap_days,
        ])?;
    }
    Ok(eras.len())
}

/// Read back a domain's era table ordered by `era_id`.
pub fn read_eras(conn: &Connection, domain: EraDomain) -> Result<Vec<Era>> {
    let table = domain.era_table();
    let sql = format!(
        "SELECT {} FROM {} ORDER BY 1",
        table.column_names().join(", "),
        table.name
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(Era {
            era_id: row.get(0)?,
            subject_id: row.get(1)?,
            concept_id: row.get(2)?,
            era_start_date: row.get(3)?,
            era_end_date: row.get(4)?,
            occurrence_count: row.get(5)?,
            gap_days: row.get(6)?,
        })
    })?;
    let mut eras = Vec::new();
    for row in rows {
        eras.push(row?);
    }
    Ok(eras)
}
