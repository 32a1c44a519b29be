//! Tabular record sources for herald.
//!
//! A source returns every row of a named table as a [`Row`] keyed by
//! normalized column name. Two implementations are provided:
//!
//! - [`google::SheetsSource`]: Google Sheets values API (read with an API key).
//! - [`file::JsonFileSource`]: a local JSON array, for offline runs and demos.

pub mod file;
pub mod google;
pub mod types;

use herald_types::Row;
use thiserror::Error;

pub use file::JsonFileSource;
pub use google::SheetsSource;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{context} returned {status}: {message}")]
    Status {
        context: &'static str,
        status: u16,
        message: String,
    },
    #[error("table \"{table}\" not found. Available tables: {}", .available.join(", "))]
    TableNotFound {
        table: String,
        available: Vec<String>,
    },
    #[error("invalid source URL: {0}")]
    InvalidUrl(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for sources that hand out the current rows of a table.
///
/// Implementations are read-only; every call reflects the source's state at
/// call time.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Short identifier used in logs (e.g. "sheets", "file").
    fn source_type(&self) -> &str;

    /// Fetch all data rows of `table`.
    ///
    /// Fails with [`FetchError::TableNotFound`] when the table does not
    /// exist, listing the tables that do.
    async fn fetch_records(&self, table: &str) -> Result<Vec<Row>, FetchError>;
}
