//! JSON run reports written by `run --report`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use omop_model::RunSummary;

/// Write `summary` as pretty-printed JSON, creating parent directories.
pub fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(summary).context("Failed to serialize run report")?;
    json.push('\n');
    fs::write(path, json)
        .with_context(|| format!("Failed to write run report to {}", path.display()))
}

/// Read a report previously written by [`write_report`].
pub fn read_report(path: &Path) -> Result<RunSummary> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run report {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse run report {}", path.display()))
}
