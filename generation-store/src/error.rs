use std::fmt::{self, Display, Formatter};

use database_api::DatabaseError;
use thiserror::Error;

use crate::RecordId;

/// The store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    List,
    Fetch,
    Delete,
}

impl Operation {
    pub const fn message(self) -> &'static str {
        match self {
            Operation::Save => "Failed to save card generation",
            Operation::List => "Failed to fetch card generations",
            Operation::Fetch => "Failed to fetch card generation",
            Operation::Delete => "Failed to delete card generation",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("{op}: {source}")]
    Database { op: Operation, source: DatabaseError },
    #[error("{op}: no card generation with id {id}")]
    NotFound { op: Operation, id: RecordId },
    #[error("{op}: {count} card generations share id {id}")]
    Ambiguous { op: Operation, id: RecordId, count: usize },
    #[error("{op}: expected exactly one row back, got {count}")]
    UnexpectedRowCount { op: Operation, count: usize },
    #[error("{op}: malformed row: {source}")]
    Decode { op: Operation, source: serde_json::Error },
}

impl PersistenceError {
    pub fn operation(&self) -> Operation {
        match self {
            PersistenceError::Database { op, .. }
            | PersistenceError::NotFound { op, .. }
            | PersistenceError::Ambiguous { op, .. }
            | PersistenceError::UnexpectedRowCount { op, .. }
            | PersistenceError::Decode { op, .. } => *op,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistenceError::NotFound { .. })
    }
}
