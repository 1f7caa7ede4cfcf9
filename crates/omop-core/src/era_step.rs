//! Pipeline steps writing the era tables.

use anyhow::Context;
use omop_model::EraDomain;
use omop_store::{read_raw_events, replace_eras};
use serde::Serialize;
use tracing::info;

use crate::context::EtlContext;
use crate::era::{build_eras, normalize_events};
use crate::error::Result;
use crate::pipeline::TransformStep;

/// Counts reported by one era consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EraStepSummary {
    pub domain: EraDomain,
    pub events: usize,
    pub eras: usize,
}

/// Recompute the full era table of `domain`.
///
/// Reads, normalizes, consolidates and rewrites inside one scoped
/// transaction; a malformed event leaves the previous era rows untouched.
pub fn consolidate_eras(ctx: &EtlContext, domain: EraDomain) -> Result<EraStepSummary> {
    let options = ctx.options().era;
    info!(
        domain = %domain,
        gap_days = options.gap_days,
        "building eras"
    );
    let summary = ctx.transaction(|conn| {
        let raw_events = read_raw_events(conn, domain)?;
        let events = normalize_events(domain, &raw_events, &options)?;
        let eras = build_eras(&events, options.gap_days);
        let written = replace_eras(conn, domain, &eras)?;
        Ok(EraStepSummary {
            domain,
            events: events.len(),
            eras: written,
        })
    })?;
    info!(
        domain = %domain,
        events = summary.events,
        eras = summary.eras,
        table = domain.era_table().name,
        "eras written"
    );
    Ok(summary)
}

/// Pipeline step wrapping [`consolidate_eras`] for one domain.
#[derive(Debug, Clone, Copy)]
pub struct EraStep {
    domain: EraDomain,
}

impl EraStep {
    pub fn new(domain: EraDomain) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> EraDomain {
        self.domain
    }
}

impl TransformStep for EraStep {
    fn execute(&self, ctx: &EtlContext) -> anyhow::Result<()> {
        consolidate_eras(ctx, self.domain)
            .with_context(|| format!("failed to build {} eras", self.domain))?;
        Ok(())
    }

    fn step_name(&self) -> &str {
        self.domain.era_table().name
    }
}
