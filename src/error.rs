use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column {index} ({column})")]
    MissingColumn { column: &'static str, index: usize },

    #[error("Empty {column} value")]
    EmptyField { column: &'static str },

    #[error("Invalid {field} value: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid calendar month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Invalid year/month {0:?} (expected YYYY-MM)")]
    InvalidYearMonth(String),
}
