//! Common error types for DTS
//!
//! Two layers, as in the rest of the workspace:
//! - [`Error`]: infrastructure failures (database, IO, configuration)
//! - [`HeError`]: human-effects and hierarchy failures surfaced to editors and
//!   analytics consumers with a stable wire code

use thiserror::Error;

/// Common result type for DTS infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for human-effects / hierarchy operations
pub type HeResult<T> = std::result::Result<T, HeError>;

/// Common error types across DTS services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Human-effects error taxonomy
///
/// Every batch-apply error aborts the whole transaction. `code()` is what the
/// HTTP layer puts on the wire; `Display` never includes row or record ids.
#[derive(Error, Debug)]
pub enum HeError {
    /// Insert/update would occupy a dimension tuple held by another row
    #[error("A row with the same disaggregation ({tuple}) already exists in {table}")]
    DuplicateDimensionTuple { table: String, tuple: String },

    /// Value failed parse, non-negativity or domain check
    #[error("Invalid value for column '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Unknown human effects table: {0}")]
    UnknownTable(String),

    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// Update referenced a row that is not part of this record/table; the id
    /// is kept for logs only
    #[error("Row not found in this table")]
    UnknownRow(String),

    #[error("Disaster record not found")]
    RecordNotFound,

    /// Parent chain loops back on itself
    #[error("Cyclic hierarchy detected at node '{node}'")]
    CyclicHierarchy { node: String },

    /// Duplicate ids or dangling parent references
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Tenant configuration (custom dimensions, hidden columns) rejected
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl HeError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            HeError::DuplicateDimensionTuple { .. } => "DuplicateDimensionTuple",
            HeError::InvalidValue { .. } => "InvalidValue",
            HeError::UnknownTable(_) => "UnknownTable",
            HeError::UnknownDimension(_) => "UnknownDimension",
            HeError::UnknownRow(_) => "UnknownRow",
            HeError::RecordNotFound => "RecordNotFound",
            HeError::CyclicHierarchy { .. } => "CyclicHierarchy",
            HeError::InvalidHierarchy(_) => "InvalidHierarchy",
            HeError::Config(_) => "Config",
            HeError::Csv(_) => "Csv",
            HeError::Json(_) => "Json",
            HeError::Database(_) => "Database",
        }
    }

    /// True for errors caused by the submitted data (as opposed to corruption
    /// or infrastructure failure)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            HeError::DuplicateDimensionTuple { .. }
                | HeError::InvalidValue { .. }
                | HeError::UnknownTable(_)
                | HeError::UnknownDimension(_)
                | HeError::UnknownRow(_)
                | HeError::Config(_)
                | HeError::Csv(_)
                | HeError::Json(_)
        )
    }

    pub(crate) fn invalid(column: impl Into<String>, reason: impl Into<String>) -> Self {
        HeError::InvalidValue {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

impl From<Error> for HeError {
    fn from(err: Error) -> Self {
        match err {
            Error::Database(e) => HeError::Database(e),
            Error::Config(msg) => HeError::Config(msg),
            Error::NotFound(_) => HeError::RecordNotFound,
            other => HeError::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let err = HeError::DuplicateDimensionTuple {
            table: "Deaths".into(),
            tuple: "sex=f".into(),
        };
        assert_eq!(err.code(), "DuplicateDimensionTuple");
        assert!(err.is_user_error());

        let err = HeError::CyclicHierarchy { node: "a".into() };
        assert_eq!(err.code(), "CyclicHierarchy");
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_display_has_no_internal_ids() {
        let err = HeError::RecordNotFound;
        assert_eq!(err.to_string(), "Disaster record not found");

        let row_id = "0b5e3c1a-7f1d-4c8e-9a51-2d0c6f1e8b11";
        let err = HeError::UnknownRow(row_id.to_string());
        assert_eq!(err.to_string(), "Row not found in this table");
        assert!(!err.to_string().contains(row_id));
    }
}
