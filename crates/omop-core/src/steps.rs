//! Standard steps of the OMOP ETL and the default pipeline.

use anyhow::Context;
use omop_model::{EraDomain, OMOP_TABLES};
use omop_store::rebuild_observation_periods;
use tracing::info;

use crate::context::EtlContext;
use crate::era_step::EraStep;
use crate::pipeline::{EtlPipeline, Precondition, TransformStep, require_tables};

/// Tables that must be loaded before the default pipeline can run.
pub const SOURCE_TABLES: &[&str] = &[
    "drug_exposure",
    "condition_occurrence",
    "concept",
    "concept_ancestor",
    "person",
];

/// Create every registered OMOP table that does not exist yet.
pub struct CreateOmopStep;

impl TransformStep for CreateOmopStep {
    fn execute(&self, ctx: &EtlContext) -> anyhow::Result<()> {
        ctx.transaction(|_| {
            ctx.store().create_tables(OMOP_TABLES)?;
            Ok(())
        })
        .context("failed to create OMOP tables")?;
        info!(tables = OMOP_TABLES.len(), "OMOP tables ready");
        Ok(())
    }

    fn step_name(&self) -> &str {
        "create_omop"
    }
}

/// Rebuild `observation_period` from drug exposures and condition occurrences.
pub struct ObservationPeriodStep;

impl TransformStep for ObservationPeriodStep {
    fn execute(&self, ctx: &EtlContext) -> anyhow::Result<()> {
        let inserted = ctx
            .transaction(|conn| Ok(rebuild_observation_periods(conn)?))
            .context("failed to rebuild observation periods")?;
        info!(periods = inserted, "observation periods written");
        Ok(())
    }

    fn step_name(&self) -> &str {
        "observation_period"
    }
}

/// Precondition requiring every [`SOURCE_TABLES`] entry to exist.
pub fn require_source_tables() -> Precondition {
    require_tables("source tables present", SOURCE_TABLES)
}

/// Build the default ETL pipeline.
///
/// This returns a pipeline with the standard steps:
/// 1. OMOP table creation
/// 2. Observation periods
/// 3. Condition eras
/// 4. Drug eras
pub fn default_pipeline() -> EtlPipeline {
    let mut pipeline = EtlPipeline::new()
        .with_precondition(require_source_tables())
        .add_step(Box::new(CreateOmopStep))
        .add_step(Box::new(ObservationPeriodStep));
    for domain in EraDomain::ALL {
        pipeline = pipeline.add_step(Box::new(EraStep::new(domain)));
    }
    pipeline
}
