use crate::error::Result;
use crate::types::{Dataset, Value};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub columns: usize,
    pub parse_errors: usize,
}

pub fn load_dataset(path: &Path) -> Result<(Dataset, LoadReport)> {
    let file = std::fs::File::open(path)?;
    let (data, report) = read_dataset(file)?;
    tracing::info!(
        path = %path.display(),
        rows = report.total_rows,
        columns = report.columns,
        skipped = report.parse_errors,
        "loaded dataset"
    );
    Ok((data, report))
}

/// Read a headed CSV into a dataset, inferring each cell's type.
pub fn read_dataset<R: Read>(reader: R) -> Result<(Dataset, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut data = Dataset::new(headers);
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;

    for result in rdr.records() {
        total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(row = total_rows, error = %e, "skipping unreadable row");
                parse_errors += 1;
                continue;
            }
        };
        data.push_row(record.iter().map(Value::infer).collect());
    }

    let report = LoadReport { total_rows, columns: data.headers().len(), parse_errors };
    Ok((data, report))
}
