use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Canonical columns the current view cannot work without.
    #[error("missing column(s) in the input: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("too many columns for a worksheet: {0}")]
    TooManyColumns(usize),

    #[error("no data loaded")]
    NoData,
}

pub type Result<T> = std::result::Result<T, ReportError>;
