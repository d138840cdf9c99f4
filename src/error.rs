use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Fatal errors. Peaks outside the genome are not errors; they are
/// reported as [`crate::peaks::Extraction::rejected`] instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("the file {} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("the file {} is not valid: {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("peak table is missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("peak table has more than one '{name}' column")]
    AmbiguousColumn { name: String },

    #[error("line {line}, column {column}: '{value}' is not an integer")]
    Parse {
        line: u64,
        column: String,
        value: String,
    },

    #[error("line {line}: no value for column {column}")]
    MissingField { line: u64, column: String },

    #[error(transparent)]
    Table(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
