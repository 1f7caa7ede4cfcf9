use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use omop_model::{RunStatus, StepStatus, StepSummary};

use crate::types::{RunResult, TableRows};

pub fn print_run_summary(result: &RunResult) {
    println!("Database: {}", result.database.display());
    if result.dry_run {
        println!("Mode: dry run (all writes rolled back)");
    }
    if let Some(path) = &result.report {
        println!("Report: {}", path.display());
    }
    println!(
        "Status: {} ({} of {} steps, {} ms)",
        result.summary.status.as_str(),
        result.summary.completed_steps(),
        result.summary.steps.len(),
        result.summary.total_duration_ms
    );

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Step"),
        header_cell("Module"),
        header_cell("Status"),
        header_cell("Duration (ms)"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Right);
    for (index, step) in result.summary.steps.iter().enumerate() {
        table.add_row(step_row(index + 1, step));
    }
    println!("{table}");

    print_table_counts(&result.tables);

    if result.summary.status == RunStatus::Aborted {
        if let Some(step) = &result.summary.failed_step {
            eprintln!("Failed step: {step}");
        }
        if let Some(error) = &result.summary.error {
            eprintln!("Error: {error}");
        }
    }
}

pub fn print_table_counts(tables: &[TableRows]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Kind"),
        header_cell("Rows"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    let mut total = 0_i64;
    for entry in tables {
        total += entry.rows.unwrap_or(0);
        table.add_row(vec![
            Cell::new(entry.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            dim_cell(entry.kind.as_str()),
            rows_cell(entry.rows),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

fn step_row(position: usize, step: &StepSummary) -> Vec<Cell> {
    vec![
        dim_cell(position),
        Cell::new(&step.name).add_attribute(Attribute::Bold),
        dim_cell(&step.module),
        status_cell(step.status),
        match step.duration_ms {
            Some(ms) => Cell::new(ms),
            None => dim_cell("-"),
        },
    ]
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: StepStatus) -> Cell {
    let color = match status {
        StepStatus::Completed => Color::Green,
        StepStatus::Failed => Color::Red,
        StepStatus::Running => Color::Yellow,
        StepStatus::Pending => Color::DarkGrey,
    };
    Cell::new(status.as_str())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

fn rows_cell(rows: Option<i64>) -> Cell {
    match rows {
        Some(count) if count > 0 => Cell::new(count),
        Some(count) => dim_cell(count),
        None => dim_cell("missing"),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
