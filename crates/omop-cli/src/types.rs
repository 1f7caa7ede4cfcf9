use std::path::PathBuf;

use omop_core::TableCount;
use omop_model::{RunSummary, TableKind};

#[derive(Debug)]
pub struct RunResult {
    pub database: PathBuf,
    pub dry_run: bool,
    pub summary: RunSummary,
    pub tables: Vec<TableRows>,
    pub report: Option<PathBuf>,
}

#[derive(Debug)]
pub struct TableRows {
    pub name: &'static str,
    pub kind: TableKind,
    /// `None` when the table does not exist in the database.
    pub rows: Option<i64>,
}

impl From<TableCount> for TableRows {
    fn from(count: TableCount) -> Self {
        Self {
            name: count.table.name,
            kind: count.table.kind,
            rows: count.rows,
        }
    }
}
