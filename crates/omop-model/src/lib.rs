pub mod era;
pub mod event;
pub mod lookup;
pub mod options;
pub mod report;
pub mod tables;

pub use era::Era;
pub use event::{EraDomain, EraKey, Event, RawEvent};
pub use lookup::ConceptLookup;
pub use options::{DEFAULT_GAP_DAYS, DEFAULT_MIN_DURATION_DAYS, EraOptions, EtlOptions, RunMode};
pub use report::{RunStatus, RunSummary, StepStatus, StepSummary};
pub use tables::{ColumnDef, ColumnType, OMOP_TABLES, TableDef, TableKind, find_table};
