use rusqlite::Connection;

use omop_model::ConceptLookup;

use crate::error::Result;

/// Load the `concept_lookup` reference table into memory.
pub fn load_concept_lookup(conn: &Connection) -> Result<ConceptLookup> {
    let mut stmt = conn.prepare(
        "SELECT domain, concept_string, standard_concept_id
         FROM concept_lookup
         ORDER BY lookup_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;
    let mut lookup = ConceptLookup::new();
    for row in rows {
        let (domain, concept_string, concept_id) = row?;
        lookup.insert(&domain, &concept_string, concept_id);
    }
    Ok(lookup)
}
