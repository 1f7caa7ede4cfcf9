//! ETL pipeline with ordered step execution.
//!
//! Each step implements the [`TransformStep`] trait and runs against a shared
//! [`EtlContext`], strictly in the order it was added.
//!
//! # Standard Pipeline Order
//!
//! 1. **create_omop** - Create every registered OMOP table
//! 2. **observation_period** - Rebuild observation periods from clinical events
//! 3. **condition_era** - Consolidate condition occurrences into eras
//! 4. **drug_era** - Consolidate ingredient-level drug exposures into eras
//!
//! # Example
//!
//! ```ignore
//! use omop_core::{EtlContext, default_pipeline};
//!
//! let ctx = EtlContext::new(store);
//! let run = default_pipeline().run_in_transaction(&ctx)?;
//! run.into_result()?;
//! ```

use std::time::{Duration, Instant};

use anyhow::anyhow;
use omop_model::{RunMode, RunStatus, RunSummary, StepStatus, StepSummary};
use omop_store::StoreError;
use tracing::{error, info, info_span};

use crate::context::EtlContext;
use crate::error::{EtlError, Result};

/// A single named unit of transformation work.
pub trait TransformStep: Send + Sync {
    /// Execute this step against the shared context.
    fn execute(&self, ctx: &EtlContext) -> anyhow::Result<()>;

    /// Name the step is registered and reported under.
    fn step_name(&self) -> &str;

    /// Label of the code implementing the step, used in logs and reports.
    ///
    /// Default implementation uses the implementing type's path.
    fn module_label(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A step backed by a closure.
pub struct FnStep<F> {
    name: String,
    module: String,
    f: F,
}

impl<F> TransformStep for FnStep<F>
where
    F: Fn(&EtlContext) -> anyhow::Result<()> + Send + Sync,
{
    fn execute(&self, ctx: &EtlContext) -> anyhow::Result<()> {
        (self.f)(ctx)
    }

    fn step_name(&self) -> &str {
        &self.name
    }

    fn module_label(&self) -> &str {
        &self.module
    }
}

/// Wrap a closure as a pipeline step.
///
/// Pass `module_path!()` as `module` to label the step with its call site.
pub fn step_fn<F>(name: impl Into<String>, module: impl Into<String>, f: F) -> FnStep<F>
where
    F: Fn(&EtlContext) -> anyhow::Result<()> + Send + Sync,
{
    FnStep {
        name: name.into(),
        module: module.into(),
        f,
    }
}

type Check = Box<dyn Fn(&EtlContext) -> anyhow::Result<()> + Send + Sync>;

/// A named check that must pass before any step runs.
pub struct Precondition {
    name: String,
    check: Check,
}

impl Precondition {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&EtlContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Outcome of one step within a run.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub module: String,
    pub status: StepStatus,
    /// Wall-clock duration; `None` for steps that never started.
    pub duration: Option<Duration>,
}

/// The step that aborted a run and its error.
#[derive(Debug)]
pub struct StepFailure {
    pub step: String,
    pub error: anyhow::Error,
}

/// Result of executing a pipeline.
#[derive(Debug)]
pub struct PipelineRun {
    pub status: RunStatus,
    pub steps: Vec<StepRecord>,
    pub failure: Option<StepFailure>,
    pub duration: Duration,
}

impl PipelineRun {
    fn pending(steps: &[Box<dyn TransformStep>]) -> Self {
        Self {
            status: RunStatus::Idle,
            steps: steps
                .iter()
                .map(|step| StepRecord {
                    name: step.step_name().to_string(),
                    module: step.module_label().to_string(),
                    status: StepStatus::Pending,
                    duration: None,
                })
                .collect(),
            failure: None,
            duration: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.name == name)
    }

    /// Serializable view of the run for reports.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            status: self.status,
            steps: self
                .steps
                .iter()
                .map(|record| StepSummary {
                    name: record.name.clone(),
                    module: record.module.clone(),
                    status: record.status,
                    duration_ms: record.duration.map(duration_ms),
                })
                .collect(),
            failed_step: self.failure.as_ref().map(|f| f.step.clone()),
            error: self.failure.as_ref().map(|f| format!("{:#}", f.error)),
            total_duration_ms: duration_ms(self.duration),
        }
    }

    /// Convert an aborted run into [`EtlError::StepFailed`].
    pub fn into_result(mut self) -> Result<PipelineRun> {
        match self.failure.take() {
            Some(failure) => Err(EtlError::StepFailed {
                step: failure.step,
                source: failure.error.into(),
            }),
            None => Ok(self),
        }
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// An ordered pipeline of transformation steps.
///
/// Steps are keyed by name: adding a step whose name is already present
/// replaces it at its existing position.
pub struct EtlPipeline {
    steps: Vec<Box<dyn TransformStep>>,
    preconditions: Vec<Precondition>,
}

impl Default for EtlPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl EtlPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            preconditions: Vec::new(),
        }
    }

    /// Add a step to the end of the pipeline, or replace the step of the same name.
    pub fn add_step(mut self, step: Box<dyn TransformStep>) -> Self {
        match self
            .steps
            .iter()
            .position(|s| s.step_name() == step.step_name())
        {
            Some(index) => self.steps[index] = step,
            None => self.steps.push(step),
        }
        self
    }

    /// Remove a step by name.
    pub fn remove_step(mut self, step_name: &str) -> Self {
        self.steps.retain(|s| s.step_name() != step_name);
        self
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// List step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_name()).collect()
    }

    pub fn precondition_names(&self) -> Vec<&str> {
        self.preconditions.iter().map(Precondition::name).collect()
    }

    /// Check every precondition, failing on the first that does not hold.
    pub fn check_preconditions(&self, ctx: &EtlContext) -> Result<()> {
        for precondition in &self.preconditions {
            (precondition.check)(ctx).map_err(|err| EtlError::Precondition {
                name: precondition.name.clone(),
                reason: format!("{err:#}"),
            })?;
        }
        Ok(())
    }

    /// Execute all steps in order, without transaction management.
    ///
    /// A failing precondition returns `Err` before any step runs. A failing
    /// step aborts the run and is reported in the returned [`PipelineRun`].
    pub fn run(&self, ctx: &EtlContext) -> Result<PipelineRun> {
        self.check_preconditions(ctx)?;
        Ok(self.execute_steps(ctx))
    }

    /// Execute all steps inside one enclosing transaction.
    ///
    /// Commits when every step completes, rolls back otherwise. In
    /// [`RunMode::DryRun`] the transaction is always rolled back.
    pub fn run_in_transaction(&self, ctx: &EtlContext) -> Result<PipelineRun> {
        self.check_preconditions(ctx)?;
        let tx = ctx.store().begin()?;
        let run = self.execute_steps(ctx);
        match (run.status, ctx.options().run_mode) {
            (RunStatus::Completed, RunMode::Commit) => {
                tx.commit().map_err(StoreError::from)?;
                info!("run transaction committed");
            }
            (status, mode) => {
                tx.rollback().map_err(StoreError::from)?;
                info!(status = status.as_str(), mode = ?mode, "run transaction rolled back");
            }
        }
        Ok(run)
    }

    fn execute_steps(&self, ctx: &EtlContext) -> PipelineRun {
        let mut run = PipelineRun::pending(&self.steps);
        run.status = RunStatus::Running;
        let total = self.steps.len();
        let started = Instant::now();

        for (index, step) in self.steps.iter().enumerate() {
            let name = step.step_name();
            let module = step.module_label();
            let _span = info_span!("step", step = name).entered();
            info!(index = index + 1, total, step = name, module, "step started");

            run.steps[index].status = StepStatus::Running;
            let step_started = Instant::now();
            let result = step.execute(ctx);
            let elapsed = step_started.elapsed();
            run.steps[index].duration = Some(elapsed);

            match result {
                Ok(()) => {
                    run.steps[index].status = StepStatus::Completed;
                    info!(
                        step = name,
                        duration_ms = duration_ms(elapsed),
                        "step completed"
                    );
                }
                Err(err) => {
                    run.steps[index].status = StepStatus::Failed;
                    error!(
                        step = name,
                        module,
                        duration_ms = duration_ms(elapsed),
                        error = %format!("{err:#}"),
                        "step failed, aborting run"
                    );
                    run.failure = Some(StepFailure {
                        step: name.to_string(),
                        error: err,
                    });
                    break;
                }
            }
        }

        run.status = if run.failure.is_some() {
            RunStatus::Aborted
        } else {
            RunStatus::Completed
        };
        run.duration = started.elapsed();
        info!(
            status = run.status.as_str(),
            steps = total,
            duration_ms = duration_ms(run.duration),
            "pipeline finished"
        );
        run
    }
}

/// Precondition failing when any of `tables` is missing from the store.
pub fn require_tables(name: impl Into<String>, tables: &'static [&'static str]) -> Precondition {
    Precondition::new(name, move |ctx| {
        let missing = ctx.store().missing_tables(tables)?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("missing tables: {}", missing.join(", ")))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use omop_store::Store;

    fn noop(name: &'static str) -> Box<dyn TransformStep> {
        Box::new(step_fn(name, module_path!(), |_| Ok(())))
    }

    #[test]
    fn add_step_replaces_same_name_in_place() {
        let pipeline = EtlPipeline::new()
            .add_step(noop("a"))
            .add_step(noop("b"))
            .add_step(noop("c"))
            .add_step(noop("a"));
        assert_eq!(pipeline.step_names(), vec!["a", "b", "c"]);

        let pipeline = pipeline.remove_step("b");
        assert_eq!(pipeline.step_names(), vec!["a", "c"]);
    }

    #[test]
    fn empty_pipeline_completes() {
        let ctx = EtlContext::new(Store::open_in_memory().unwrap());
        let run = EtlPipeline::new().run(&ctx).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.steps.is_empty());
        assert!(run.summary().is_success());
    }

    #[test]
    fn closure_steps_report_their_module() {
        let ctx = EtlContext::new(Store::open_in_memory().unwrap());
        let run = EtlPipeline::new().add_step(noop("only")).run(&ctx).unwrap();
        let record = run.step("only").unwrap();
        assert_eq!(record.module, module_path!());
        assert_eq!(record.status, StepStatus::Completed);
        assert!(record.duration.is_some());
    }

    #[test]
    fn require_tables_names_missing_tables() {
        let ctx = EtlContext::new(Store::open_in_memory().unwrap());
        let pipeline = EtlPipeline::new()
            .with_precondition(require_tables("tables present", &["person", "concept"]));
        let err = pipeline.check_preconditions(&ctx).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("tables present"), "{message}");
        assert!(message.contains("person, concept"), "{message}");
    }
}
