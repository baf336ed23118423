//! Error types shared by the distance functions, the keyboard model and the index.

use thiserror::Error;

/// Errors returned by index construction, mutation and lookup.
///
/// Every fallible operation either succeeds completely or returns one of these
/// with the structure left untouched.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("The value `{0}` already exists")]
    AlreadyExists(String),

    #[error("The value `{0}` does not exist")]
    NotFound(String),

    #[error("Node `{value}` has no link at distance {distance}")]
    EdgeNotFound { value: String, distance: usize },

    #[error("Subnode `{0}` is linked but not defined as a node")]
    MissingReference(String),

    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl IndexError {
    /// Whether this error means a value or edge was looked up and not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::EdgeNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
