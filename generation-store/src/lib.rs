use std::{num::NonZeroUsize, sync::Arc};

use database_api::{Database, Filter, Row, Select};
use tracing as log;

pub use error::{Operation, PersistenceError};
pub use model::{GenerationRecord, GenerationRow, NewGenerationInput, RecordId};

pub mod config;
mod error;
mod model;

use model::NewGenerationRow;

pub const DEFAULT_TABLE: &str = "card_generations";

pub const DEFAULT_LIST_LIMIT: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(limit) => limit,
    None => unreachable!(),
};

type Result<T> = std::result::Result<T, PersistenceError>;

/// Saved card generations, one database round-trip per call.
///
/// The store keeps no state of its own, so a single instance can be shared
/// between any number of tasks.
pub struct GenerationStore {
    db: Arc<dyn Database>,
    table: Box<str>,
}

impl GenerationStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self::with_table(db, DEFAULT_TABLE)
    }

    pub fn with_table(db: Arc<dyn Database>, table: impl Into<Box<str>>) -> Self {
        Self {
            db,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Inserts a new generation and returns it with its assigned id and creation time.
    pub async fn create(&self, input: &NewGenerationInput) -> Result<GenerationRecord> {
        let op = Operation::Save;
        log::info!("Saving card generation to {}", self.table);

        let row = model::to_row(&NewGenerationRow::from(input))
            .map_err(|source| failed(PersistenceError::Decode { op, source }))?;
        let mut rows = self
            .db
            .insert(&self.table, vec![row])
            .await
            .map_err(|source| failed(PersistenceError::Database { op, source }))?;

        if rows.len() != 1 {
            return Err(failed(PersistenceError::UnexpectedRowCount { op, count: rows.len() }));
        }

        let record = decode(op, rows.remove(0))?;
        log::info!("Saved card generation {}", record.id);
        Ok(record)
    }

    /// The `limit` most recent generations, newest first.
    pub async fn list(&self, limit: NonZeroUsize) -> Result<Vec<GenerationRecord>> {
        let op = Operation::List;
        log::debug!("Fetching up to {} saved generations", limit);

        let query = Select::builder()
            .order_desc("created_at")
            .limit(limit.get())
            .build();
        let rows = self
            .db
            .select(&self.table, &query)
            .await
            .map_err(|source| failed(PersistenceError::Database { op, source }))?;

        let records = rows
            .into_iter()
            .map(|row| decode(op, row))
            .collect::<Result<Vec<_>>>()?;
        log::info!("Fetched {} saved generations", records.len());
        Ok(records)
    }

    pub async fn list_recent(&self) -> Result<Vec<GenerationRecord>> {
        self.list(DEFAULT_LIST_LIMIT).await
    }

    /// Fetches exactly one generation. Zero or several matching rows are errors.
    pub async fn get_by_id(&self, id: &RecordId) -> Result<GenerationRecord> {
        let op = Operation::Fetch;
        log::debug!("Fetching generation {}", id);

        // two rows are enough to tell "one" from "many"
        let query = Select::builder().eq("id", id.to_value()).limit(2).build();
        let mut rows = self
            .db
            .select(&self.table, &query)
            .await
            .map_err(|source| failed(PersistenceError::Database { op, source }))?;

        match rows.len() {
            0 => Err(failed(PersistenceError::NotFound { op, id: id.clone() })),
            1 => decode(op, rows.remove(0)),
            count => Err(failed(PersistenceError::Ambiguous {
                op,
                id: id.clone(),
                count,
            })),
        }
    }

    /// Deletes a generation without checking that it exists first.
    ///
    /// Returns `true` for every successful request, including one that matched nothing.
    pub async fn delete_by_id(&self, id: &RecordId) -> Result<bool> {
        let op = Operation::Delete;
        log::info!("Deleting generation {}", id);

        let removed = self
            .db
            .delete(&self.table, &[Filter::eq("id", id.to_value())])
            .await
            .map_err(|source| failed(PersistenceError::Database { op, source }))?;

        if removed == 0 {
            log::warn!("No generation with id {} was found, nothing deleted", id);
        } else {
            log::info!("Deleted generation {} ({} rows)", id, removed);
        }
        Ok(true)
    }

    /// Probes the table with a single-row read. Never fails.
    pub async fn health_check(&self) -> bool {
        log::debug!("Testing database connection...");

        let query = Select::builder().column("id").limit(1).build();
        match self.db.select(&self.table, &query).await {
            Ok(_) => {
                log::info!("Database connection successful");
                true
            }
            Err(e) => {
                log::warn!("Database connection test failed: {}", e);
                false
            }
        }
    }
}

fn decode(op: Operation, row: Row) -> Result<GenerationRecord> {
    GenerationRow::from_row(row)
        .map(GenerationRecord::from)
        .map_err(|source| failed(PersistenceError::Decode { op, source }))
}

fn failed(err: PersistenceError) -> PersistenceError {
    log::error!("{}", err);
    err
}
