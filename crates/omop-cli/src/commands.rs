use std::path::Path;

use anyhow::{Context, Result, bail};
use comfy_table::Table;
use tracing::{info, info_span};

use omop_cli::report::write_report;
use omop_core::{EtlContext, default_pipeline, table_counts};
use omop_model::{EraOptions, EtlOptions, OMOP_TABLES, RunMode};
use omop_store::Store;

use crate::cli::{DatabaseArgs, RunArgs};
use crate::summary::apply_table_style;
use crate::types::{RunResult, TableRows};

pub fn run_tables() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Table", "Kind", "Columns"]);
    apply_table_style(&mut table);
    for def in OMOP_TABLES {
        table.add_row(vec![
            def.name.to_string(),
            def.kind.as_str().to_string(),
            def.column_names().join(", "),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_init(args: &DatabaseArgs) -> Result<Vec<TableRows>> {
    let store = Store::open(&args.database)
        .with_context(|| format!("open {}", args.database.display()))?;
    store
        .create_tables(OMOP_TABLES)
        .context("create OMOP tables")?;
    info!(
        database = %args.database.display(),
        tables = OMOP_TABLES.len(),
        "OMOP tables created"
    );
    count_tables(&store)
}

pub fn run_summary(args: &DatabaseArgs) -> Result<Vec<TableRows>> {
    let store = open_existing(&args.database)?;
    count_tables(&store)
}

pub fn run_etl(args: &RunArgs) -> Result<RunResult> {
    let run_span = info_span!("run", database = %args.database.display());
    let _run_guard = run_span.enter();

    let options = EtlOptions::new()
        .with_era(
            EraOptions::new()
                .with_gap_days(args.gap_days)
                .with_min_duration_days(args.min_duration_days),
        )
        .with_run_mode(if args.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Commit
        });
    info!(
        gap_days = options.era.gap_days,
        min_duration_days = options.era.min_duration_days,
        dry_run = args.dry_run,
        "starting ETL run"
    );

    let store = open_existing(&args.database)?;
    let ctx = EtlContext::new(store)
        .with_options(options)
        .load_lookups()
        .context("load concept lookups")?;
    let run = default_pipeline()
        .run_in_transaction(&ctx)
        .context("run ETL pipeline")?;
    let summary = run.summary();

    if let Some(path) = &args.report {
        write_report(path, &summary)
            .with_context(|| format!("write report {}", path.display()))?;
        info!(path = %path.display(), "run report written");
    }

    Ok(RunResult {
        database: args.database.clone(),
        dry_run: args.dry_run,
        summary,
        tables: count_tables(ctx.store())?,
        report: args.report.clone(),
    })
}

fn open_existing(path: &Path) -> Result<Store> {
    if !path.is_file() {
        bail!("database not found: {}", path.display());
    }
    Store::open(path).with_context(|| format!("open {}", path.display()))
}

fn count_tables(store: &Store) -> Result<Vec<TableRows>> {
    let counts = table_counts(store).context("count table rows")?;
    Ok(counts.into_iter().map(TableRows::from).collect())
}
