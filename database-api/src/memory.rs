use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

use super::*;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Default)]
struct Table {
    next_id: u64,
    rows: Vec<Row>,
}

/// In-process table store with the same observable behavior as the REST backend.
///
/// Rows without an `id` get the next value of a per-table counter, which is never
/// reused after a delete. Rows without a `created_at` get the current clock time.
pub struct MemoryDatabase {
    tables: Mutex<HashMap<String, Table>>,
    clock: Clock,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        MemoryDatabase {
            tables: Mutex::new(HashMap::new()),
            clock: Box::new(clock),
        }
    }

    /// Number of rows currently stored in `table`.
    pub async fn len(&self, table: &str) -> usize {
        let tables = self.tables.lock().await;
        tables.get(table).map_or(0, |t| t.rows.len())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError> {
        let mut tables = self.tables.lock().await;
        let entry = tables.entry(table.to_owned()).or_default();

        // Reject the whole batch before touching the table
        for (i, row) in rows.iter().enumerate() {
            let Some(id) = row.get("id").filter(|v| !v.is_null()) else {
                continue;
            };
            let key = Filter::eq("id", id.clone());
            let taken = entry.rows.iter().any(|r| key.matches(r)) || rows[..i].iter().any(|r| key.matches(r));
            if taken {
                return Err(DatabaseError::Constraint(format!(
                    "duplicate key value violates unique constraint \"{table}_pkey\""
                )));
            }
        }

        let explicit: Vec<Value> = rows
            .iter()
            .filter_map(|r| r.get("id"))
            .filter(|v| !v.is_null())
            .cloned()
            .collect();

        let mut inserted = Vec::with_capacity(rows.len());
        for mut row in rows {
            match row.get("id").and_then(Value::as_u64) {
                Some(id) => entry.next_id = entry.next_id.max(id),
                None if row.get("id").map_or(true, Value::is_null) => {
                    // text ids such as "10" compare equal to the number 10
                    let id = loop {
                        entry.next_id += 1;
                        let key = Filter::eq("id", entry.next_id);
                        let taken = entry.rows.iter().any(|r| key.matches(r)) || explicit.iter().any(|v| key.matches_value(v));
                        if !taken {
                            break entry.next_id;
                        }
                    };
                    row.insert("id".into(), Value::from(id));
                }
                None => {}
            }
            if row.get("created_at").map_or(true, Value::is_null) {
                let now = (self.clock)().to_rfc3339_opts(SecondsFormat::Micros, true);
                row.insert("created_at".into(), Value::String(now));
            }
            entry.rows.push(row.clone());
            inserted.push(row);
        }

        Ok(inserted)
    }

    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, DatabaseError> {
        let tables = self.tables.lock().await;
        let Some(entry) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&Row> = entry.rows.iter().filter(|r| query.matches(r)).collect();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| order.compare(a, b));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows.into_iter().map(|r| query.project(r)).collect())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, DatabaseError> {
        let mut tables = self.tables.lock().await;
        let Some(entry) = tables.get_mut(table) else {
            return Ok(0);
        };

        let before = entry.rows.len();
        entry.rows.retain(|r| !filters.iter().all(|f| f.matches(r)));
        Ok((before - entry.rows.len()) as u64)
    }
}
