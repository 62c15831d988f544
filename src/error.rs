/// Error types for the dashboard data pipeline
use std::path::PathBuf;

use thiserror::Error;

/// Every failure the loaders and the lookup can report.
///
/// None of these are fatal: the web layer renders them inline and the user
/// can retry the same or a different action.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    /// Source file does not exist
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Required columns are absent after header normalization
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Unreadable, corrupt or unexpected spreadsheet
    #[error("failed to read spreadsheet: {0}")]
    ReadError(String),

    /// Empty or blank lookup input
    #[error("query is empty")]
    InvalidQuery,

    /// Well-formed query without a matching record
    #[error("no record for identifier {0}")]
    NotFound(String),
}

impl DashboardError {
    /// Stable identifier the pages use to choose an inline message.
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::FileNotFound(_) => "file_not_found",
            DashboardError::MissingColumns(_) => "missing_columns",
            DashboardError::ReadError(_) => "read_error",
            DashboardError::InvalidQuery => "invalid_query",
            DashboardError::NotFound(_) => "not_found",
        }
    }
}

impl From<calamine::Error> for DashboardError {
    fn from(err: calamine::Error) -> Self {
        DashboardError::ReadError(err.to_string())
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        DashboardError::ReadError(err.to_string())
    }
}

/// Type alias for Results using DashboardError
pub type Result<T> = std::result::Result<T, DashboardError>;
