//! Era consolidation engine and step pipeline orchestrator for the OMOP ETL.

pub mod context;
pub mod era;
pub mod era_step;
pub mod error;
pub mod pipeline;
pub mod steps;
pub mod summary;

pub use context::EtlContext;
pub use era::{build_eras, normalize_events};
pub use era_step::{EraStep, EraStepSummary, consolidate_eras};
pub use error::{EtlError, Result};
pub use pipeline::{
    EtlPipeline, FnStep, PipelineRun, Precondition, StepFailure, StepRecord, TransformStep,
    require_tables, step_fn,
};
pub use steps::{
    CreateOmopStep, ObservationPeriodStep, SOURCE_TABLES, default_pipeline, require_source_tables,
};
pub use summary::{TableCount, table_counts};
