//! Row counts of the tables an ETL run fills.

use omop_model::{OMOP_TABLES, TableDef, TableKind};
use omop_store::Store;

use crate::error::Result;

/// Row count of one registered table; `None` when the table does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCount {
    pub table: &'static TableDef,
    pub rows: Option<i64>,
}

/// Count rows of every registered clinical and derived table.
pub fn table_counts(store: &Store) -> Result<Vec<TableCount>> {
    let mut counts = Vec::new();
    for table in OMOP_TABLES
        .iter()
        .filter(|table| matches!(table.kind, TableKind::Clinical | TableKind::Derived))
    {
        let rows = if store.table_exists(table.name)? {
            Some(store.count_rows(table)?)
        } else {
            None
        };
        counts.push(TableCount { table, rows });
    }
    Ok(counts)
}
