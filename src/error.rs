use std::io;

use thiserror::Error;

/// Errors raised while normalizing a source artifact or emitting a table.
///
/// `Format`, `MissingField`, `StructuralCorruption` and `DegenerateInput`
/// abort the artifact they were raised for. Nothing is retried.
#[derive(Debug, Error)]
pub enum UnifyError {
    #[error("{source_name}:{line}: '{token}' is not a valid {expected}")]
    Format {
        source_name: String,
        line: usize,
        token: String,
        expected: &'static str,
    },
    #[error("{source_name}:{line}: missing field '{field}'")]
    MissingField {
        source_name: String,
        line: usize,
        field: String,
    },
    #[error("{source_name}:{line}: structural corruption: {reason}")]
    StructuralCorruption {
        source_name: String,
        line: usize,
        reason: String,
    },
    #[error("{source_name}: degenerate input: {reason}")]
    DegenerateInput { source_name: String, reason: String },
    #[error("column '{column}' has {found} rows, expected {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type UnifyResult<T> = Result<T, UnifyError>;
