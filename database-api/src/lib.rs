use async_trait::async_trait;
use serde_json::{Map, Value};

pub use error::*;
pub use memory::*;
pub use query::*;
pub use reqwest::StatusCode;
pub use rest::*;

mod error;
mod memory;
mod query;
mod rest;

/// A single table row, keyed by column name.
pub type Row = Map<String, Value>;

/// Structured-query access to a remote (or fake) table store.
///
/// Implementations own the wire protocol. Callers only deal in rows.
#[async_trait]
pub trait Database: Send + Sync {
    /// Inserts `rows` into `table` and returns them as stored, generated columns included.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError>;

    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, DatabaseError>;

    /// Deletes every row matching all `filters` and returns how many were removed.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, DatabaseError>;
}
