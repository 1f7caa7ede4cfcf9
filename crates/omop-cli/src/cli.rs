//! CLI argument definitions for the OMOP ETL runner.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;
use omop_model::{DEFAULT_GAP_DAYS, DEFAULT_MIN_DURATION_DAYS};

#[derive(Parser)]
#[command(
    name = "omop-etl",
    version,
    about = "OMOP ETL - Build observation periods and eras in an OMOP CDM database",
    long_about = "Run the OMOP ETL core against a SQLite CDM database.\n\n\
                  Rebuilds observation periods, condition eras and ingredient-level\n\
                  drug eras inside a single transaction."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the default ETL pipeline against a database.
    Run(RunArgs),

    /// Create every registered OMOP table in a database.
    Init(DatabaseArgs),

    /// Print row counts of the clinical and derived tables.
    Summary(DatabaseArgs),

    /// List the registered OMOP tables.
    Tables,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the SQLite CDM database.
    #[arg(value_name = "DATABASE")]
    pub database: PathBuf,

    /// Maximum silence in days between two events of the same era.
    #[arg(long = "gap-days", value_name = "N", default_value_t = DEFAULT_GAP_DAYS)]
    pub gap_days: u32,

    /// Duration in days given to events without an end date or days supply.
    #[arg(
        long = "min-duration-days",
        value_name = "N",
        default_value_t = DEFAULT_MIN_DURATION_DAYS
    )]
    pub min_duration_days: u32,

    /// Execute every step, then roll back all writes.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Write a JSON run report to this path.
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct DatabaseArgs {
    /// Path to the SQLite CDM database.
    #[arg(value_name = "DATABASE")]
    pub database: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
