use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the MER statistics pipeline.
#[derive(Error, Debug)]
pub enum MerError {
    /// A source file could not be opened or read from disk.
    #[error("Failed to read {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row violates the raw or normalized record invariants.
    ///
    /// `row` is the 1-based data row number; the header line is not counted.
    #[error("Malformed row {row} in {path}{}: {reason}", field_suffix(.field))]
    MalformedRow {
        path: PathBuf,
        row: u64,
        field: Option<String>,
        reason: String,
    },

    /// The header line lacks a column the format requires.
    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: String },

    /// The normalized output (or its temporary file) could not be written.
    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A raw-format name is not one of the recognised format variants.
    #[error("Unknown dump format: {0}")]
    UnknownFormat(String),

    /// A month token is not a valid `YYYYMM` value.
    #[error("Invalid month token: {0}")]
    InvalidMonth(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(f) => format!(" (field '{}')", f),
        None => String::new(),
    }
}

impl MerError {
    /// Build a [`MerError::MalformedRow`].
    pub fn malformed_row(
        path: impl Into<PathBuf>,
        row: u64,
        field: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        MerError::MalformedRow {
            path: path.into(),
            row,
            field: field.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// The 1-based row number carried by a [`MerError::MalformedRow`].
    pub fn row(&self) -> Option<u64> {
        match self {
            MerError::MalformedRow { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the mer crates.
pub type Result<T> = std::result::Result<T, MerError>;
