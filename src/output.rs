use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::cost::{CostSource, CostedDataset, COST_COLUMN};
use crate::error::{ReportError, Result};
use crate::types::{DailyCostRow, LineItemRecord, Value};
use crate::util::format_number;

/// Serialize records as CSV into any writer, header row first.
pub fn csv_into<W: io::Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    rows.iter().try_for_each(|r| wtr.serialize(r))?;
    wtr.flush()?;
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    csv_into(File::create(path)?, rows)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()?;
    Ok(())
}

/// Markdown table of at most `limit` rows.
pub fn render_table<T: Tabled + Clone>(rows: &[T], limit: usize) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows.iter().take(limit).cloned()).with(Style::markdown()).to_string()
}

pub fn print_table<T: Tabled + Clone>(title: &str, note: Option<&str>, rows: &[T], limit: usize) {
    match note {
        Some(n) => println!("{}\n({})\n", title, n),
        None => println!("{}\n", title),
    }
    println!("{}\n", render_table(rows, limit));
}

/// One bar per day, scaled so the largest total spans `width` characters.
pub fn render_daily_bars(days: &[DailyCostRow], width: usize) -> String {
    let max = days.iter().map(|d| d.cost).fold(0.0_f64, f64::max);
    days.iter()
        .map(|d| {
            let len = if max > 0.0 && d.cost > 0.0 {
                ((d.cost / max) * width as f64).round().max(1.0) as usize
            } else {
                0
            };
            format!(
                "{} | {:<width$} {}",
                d.date.format("%Y-%m-%d"),
                "#".repeat(len),
                format_number(d.cost, 2),
                width = width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn column_index(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| ReportError::TooManyColumns(col))
}

/// One worksheet, bold header row, no index column.
fn save_sheet(path: &Path, sheet: &str, headers: &[String], rows: &[Vec<Value>]) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;

    for (col, h) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col)?, h, &bold)?;
    }
    for (r, cells) in rows.iter().enumerate() {
        let row = (r + 1) as u32;
        for (col, cell) in cells.iter().enumerate() {
            let col = column_index(col)?;
            match cell {
                Value::Number(n) => {
                    worksheet.write_number(row, col, *n)?;
                }
                Value::Text(_) | Value::Date(_) => {
                    worksheet.write_string(row, col, cell.to_string())?;
                }
                Value::Missing => {}
            }
        }
    }

    workbook.save(path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "exported worksheet");
    Ok(())
}

fn number(v: Option<f64>) -> Value {
    v.map(Value::Number).unwrap_or(Value::Missing)
}

fn text(v: &Option<String>) -> Value {
    v.clone().map(Value::Text).unwrap_or(Value::Missing)
}

/// Export the filtered raw rows. A cost synthesized from fee components is
/// appended as its own column; a direct cost column is already among the headers.
pub fn export_rows_xlsx(path: &Path, data: &CostedDataset) -> Result<()> {
    let mut headers = data.data.headers().to_vec();
    let with_cost = matches!(data.source, CostSource::Components(_));
    if with_cost {
        headers.push(COST_COLUMN.to_string());
    }
    let rows: Vec<Vec<Value>> = (0..data.len())
        .map(|r| {
            let mut cells = data.data.row(r).to_vec();
            if with_cost {
                cells.push(number(data.cost_at(r)));
            }
            cells
        })
        .collect();
    save_sheet(path, "filtered", &headers, &rows)
}

pub fn export_line_items_xlsx(path: &Path, items: &[LineItemRecord]) -> Result<()> {
    let headers: Vec<String> = [
        "invoice_id", "shop", "customer", "carrier", "revenue", "cost", "result", "result_pct",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let rows: Vec<Vec<Value>> = items
        .iter()
        .map(|i| {
            vec![
                text(&i.invoice_id),
                text(&i.shop),
                text(&i.customer),
                text(&i.carrier),
                number(i.revenue),
                number(i.cost),
                number(i.result),
                number(i.result_pct),
            ]
        })
        .collect();
    save_sheet(path, "line_items", &headers, &rows)
}
