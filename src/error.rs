use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a run. None of these are retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input file {path:?} not found")]
    FileNotFound { path: PathBuf },

    /// The file exists but could not be read as a table.
    #[error("failed to read {path:?} as a table: {message}")]
    Format { path: PathBuf, message: String },

    /// A cell that cannot be read as the number the computation needs.
    #[error("row {row}: {column} value \"{value}\" is not {expected}")]
    InvalidValue { row: usize, column: String, value: String, expected: &'static str },

    #[error("column \"{column}\" not found, available columns: {available}")]
    MissingColumn { column: String, available: String },

    /// No grouping could be derived from the data.
    #[error("cannot group records: {0}")]
    DegenerateInput(String),

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn format(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Format { path: path.into(), message: message.to_string() }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
