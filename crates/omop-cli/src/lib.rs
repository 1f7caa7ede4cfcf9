//! CLI library components for the OMOP ETL runner.

pub mod logging;
pub mod report;
