//! Observation period derivation.

use rusqlite::{Connection, params};

use crate::error::Result;

/// Period type concept recorded on derived observation periods (Registry).
pub const REGISTRY_PERIOD_TYPE_CONCEPT_ID: i64 = 32879;

/// Placeholder date used upstream for unknown event dates.
pub const SENTINEL_DATE: &str = "1700-01-01";

const OBSERVATION_PERIOD_SQL: &str = "
    INSERT INTO observation_period (
        person_id,
        observation_period_start_date,
        observation_period_end_date,
        period_type_concept_id
    )
    SELECT person_id,
           MIN(start_date),
           MAX(end_date),
           ?1
    FROM (
        SELECT person_id,
               drug_exposure_start_date AS start_date,
               MAX(drug_exposure_start_date,
                   COALESCE(NULLIF(drug_exposure_end_date, ?2), drug_exposure_start_date)) AS end_date
        FROM drug_exposure
        WHERE drug_exposure_start_date <> ?2
        UNION ALL
        SELECT person_id,
               condition_start_date,
               MAX(condition_start_date,
                   COALESCE(NULLIF(condition_end_date, ?2), condition_start_date))
        FROM condition_occurrence
        WHERE condition_start_date <> ?2
    ) events
    WHERE person_id IN (SELECT person_id FROM person)
    GROUP BY person_id
    ORDER BY person_id";

/// Rebuild `observation_period` from the clinical event tables.
///
/// Sentinel or missing end dates fall back to the event's start date, and an
/// end before the start is raised to the start. Returns the number of periods
/// inserted. Runs inside the caller's transaction scope.
pub fn rebuild_observation_periods(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM observation_period", [])?;
    let inserted = conn.execute(
        OBSERVATION_PERIOD_SQL,
        params![REGISTRY_PERIOD_TYPE_CONCEPT_ID, SENTINEL_DATE],
    )?;
    Ok(inserted)
}
