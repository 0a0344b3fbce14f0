//! Human-readable rendering of replay reports and log listings.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use squirrel_model::{Table as DataTable, column_stats};
use squirrel_pipeline::{EntryStatus, ReplayReport};

const PREVIEW_ROWS: usize = 20;

pub fn print_run_summary(report: &ReplayReport, with_stats: bool) {
    print_outcomes(report);
    for (name, table) in &report.tables {
        println!();
        println!(
            "Table {name} ({} rows x {} cols)",
            table.n_rows(),
            table.n_cols()
        );
        print_table_preview(table);
        if with_stats {
            print_column_stats(table);
        }
    }
    let failures = report.failure_count();
    if failures > 0 {
        eprintln!(
            "{failures} {} failed",
            if failures == 1 { "entry" } else { "entries" }
        );
    }
}

fn print_outcomes(report: &ReplayReport) {
    if report.outcomes.is_empty() {
        println!("Pipeline log has no entries.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Status"),
        header_cell("Action"),
        header_cell("Detail"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 1, CellAlignment::Center);
    for outcome in &report.outcomes {
        let (status, detail) = match &outcome.status {
            EntryStatus::Applied => (Cell::new("OK").fg(Color::Green), dim_cell("-")),
            EntryStatus::Failed(error) => (
                Cell::new("FAIL")
                    .fg(Color::Red)
                    .add_attribute(Attribute::Bold),
                Cell::new(error),
            ),
            EntryStatus::Skipped => (Cell::new("SKIP").fg(Color::DarkGrey), dim_cell("-")),
        };
        table.add_row(vec![
            Cell::new(outcome.id),
            status,
            Cell::new(&outcome.label),
            detail,
        ]);
    }
    println!("{table}");
}

fn print_table_preview(data: &DataTable) {
    let mut table = Table::new();
    table.set_header(data.column_names().map(header_cell).collect::<Vec<_>>());
    apply_table_style(&mut table);
    let shown = data.n_rows().min(PREVIEW_ROWS);
    for idx in 0..shown {
        let row: Vec<Cell> = data.row(idx).values().map(Cell::new).collect();
        table.add_row(row);
    }
    println!("{table}");
    if data.n_rows() > shown {
        println!("... {} more rows", data.n_rows() - shown);
    }
}

fn print_column_stats(data: &DataTable) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Dtype"),
        header_cell("Nulls"),
        header_cell("Min"),
        header_cell("Max"),
        header_cell("Mean"),
        header_cell("Std"),
        header_cell("Median"),
    ]);
    apply_table_style(&mut table);
    for (name, column) in data.columns() {
        let stats = column_stats(column);
        let row = if let Some(num) = &stats.numeric {
            vec![
                Cell::new(name),
                Cell::new(&stats.dtype),
                Cell::new(stats.null_count),
                Cell::new(format_num(num.min)),
                Cell::new(format_num(num.max)),
                Cell::new(format_num(num.mean)),
                Cell::new(format_num(num.std)),
                Cell::new(format_num(num.median)),
            ]
        } else if let Some(text) = &stats.text {
            vec![
                Cell::new(name),
                Cell::new(&stats.dtype),
                Cell::new(stats.null_count),
                Cell::new(format!("len {}", text.min_len)),
                Cell::new(format!("len {}", text.max_len)),
                Cell::new(format!("len {:.1}", text.mean_len)),
                dim_cell("-"),
                dim_cell("-"),
            ]
        } else {
            vec![
                Cell::new(name),
                Cell::new(&stats.dtype),
                Cell::new(stats.null_count),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
            ]
        };
        table.add_row(row);
    }
    println!("{table}");
}

fn format_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value}")
    } else {
        format!("{value:.3}")
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
