use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the data-access layer.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// File missing, unreadable or unparseable, or the table lacks a
    /// required column.
    #[error("failed to load '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// A query referenced a column the loaded table does not have.
    #[error("unknown column '{column}' (available: {})", available.join(", "))]
    Column {
        column: String,
        available: Vec<String>,
    },

    /// A query was issued before any dataset was loaded.
    #[error("no dataset loaded")]
    NotLoaded,

    /// The cleaned table was rejected by the load options.
    #[error("invalid table: {0}")]
    Invalid(String),

    #[error("expected exactly {expected} ingredient sets, got {found}")]
    SetCount { expected: usize, found: usize },

    #[error("configuration error: {0}")]
    Config(String),
}

impl DatasetError {
    pub(crate) fn load(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        DatasetError::Load {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;
