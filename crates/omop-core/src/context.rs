use omop_model::tables::CONCEPT_LOOKUP;
use omop_model::{ConceptLookup, EtlOptions};
use omop_store::{Store, load_concept_lookup};
use rusqlite::Connection;
use tracing::debug;

use crate::error::{EtlError, Result};

/// Shared state handed to every step of a run.
pub struct EtlContext {
    store: Store,
    options: EtlOptions,
    lookups: ConceptLookup,
}

impl EtlContext {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            options: EtlOptions::default(),
            lookups: ConceptLookup::default(),
        }
    }

    pub fn with_options(mut self, options: EtlOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_lookups(mut self, lookups: ConceptLookup) -> Self {
        self.lookups = lookups;
        self
    }

    /// Preload concept lookups from the `concept_lookup` table, if present.
    pub fn load_lookups(mut self) -> Result<Self> {
        if self.store.table_exists(CONCEPT_LOOKUP.name)? {
            self.lookups = load_concept_lookup(self.store.connection())?;
            debug!(entries = self.lookups.len(), "loaded concept lookups");
        }
        Ok(self)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn options(&self) -> &EtlOptions {
        &self.options
    }

    pub fn lookups(&self) -> &ConceptLookup {
        &self.lookups
    }

    /// Run `f` in a scoped transaction, joining the run transaction if one is open.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.store.transaction::<T, EtlError, F>(f)
    }

    pub fn into_store(self) -> Store {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omop_model::tables::{OMOP_TABLES, PERSON};
    use omop_model::{EraOptions, RunMode};

    fn context() -> EtlContext {
        let store = Store::open_in_memory().unwrap();
        store.create_tables(OMOP_TABLES).unwrap();
        EtlContext::new(store)
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let ctx = context();
        let result: Result<()> = ctx.transaction(|conn| {
            conn.execute("INSERT INTO person VALUES (1, 8507, 1980)", [])
                .map_err(omop_store::StoreError::from)?;
            Err(EtlError::Precondition {
                name: "forced".to_string(),
                reason: "test".to_string(),
            })
        });
        assert!(result.is_err());
        assert_eq!(ctx.store().count_rows(&PERSON).unwrap(), 0);
    }

    #[test]
    fn loads_lookups_when_table_present() {
        let ctx = context();
        ctx.store()
            .connection()
            .execute_batch("INSERT INTO concept_lookup VALUES (1, 'Male', 8507, 'gender', NULL);")
            .unwrap();
        let ctx = ctx.load_lookups().unwrap();
        assert_eq!(ctx.lookups().resolve("gender", "MALE"), Some(8507));
    }

    #[test]
    fn missing_lookup_table_leaves_lookups_empty() {
        let ctx = EtlContext::new(Store::open_in_memory().unwrap())
            .with_options(
                EtlOptions::new()
                    .with_era(EraOptions::new().with_gap_days(0))
                    .with_run_mode(RunMode::DryRun),
            )
            .load_lookups()
            .unwrap();
        assert!(ctx.lookups().is_empty());
        assert_eq!(ctx.options().era.gap_days, 0);
    }
}
