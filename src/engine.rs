//! Generic CRUD Engine
//!
//! One operation per member of the operation set, each working against ANY
//! table without per-table code: the table name is validated against the
//! live catalog, the primary key is derived from the schema, and a
//! parameterized statement is built at request time.
//!
//! # Stateless Design
//! Each method acquires a store connection for the lifetime of that one call
//! and releases it on every exit path. Operations are independent — there
//! are no multi-statement transactions, and a scan followed by per-row work
//! is not atomic with respect to concurrent writers.
//!
//! # Security Invariant
//! Every caller-supplied VALUE is bound as a statement parameter. Only table
//! and column NAMES — validated against live schema metadata immediately
//! before use — are interpolated, inside double-quoted identifiers.

use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::catalog::{self, ColumnDef};
use crate::error::{Result, TabulaError};
use crate::store::{self, Record, StoreConfig};

/// Default window size for bounded scans when the caller omits a limit.
///
/// Distinct from the interpreter's narrower conversational default
/// ([`crate::interpret::CONVERSATIONAL_LIMIT`]); the two are separate
/// constants on purpose.
pub const DEFAULT_SCAN_LIMIT: i64 = 100;

/// Pagination window for bounded scans
///
/// Values are passed through to the store as-is; there is no server-side
/// clamping of the upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    #[must_use]
    pub const fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: DEFAULT_SCAN_LIMIT, offset: 0 }
    }
}

/// Result of `create_record`: the store-assigned key of the new row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResult {
    pub id: i64,
}

/// Result of `update_record`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub updated: bool,
}

/// Result of `delete_record`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted: bool,
}

/// Generic CRUD engine over one store
///
/// Failures surface immediately and typed; nothing is retried.
#[derive(Debug, Clone)]
pub struct CrudEngine {
    store: StoreConfig,
}

impl CrudEngine {
    /// Create an engine over a store
    #[must_use]
    pub fn new(store: StoreConfig) -> Self {
        Self { store }
    }

    /// The store this engine operates on
    #[must_use]
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// List the tables currently in the catalog
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.store.open_read_only()?;
        catalog::list_tables(&conn)
    }

    /// Bounded scan over a table's store-native row order
    ///
    /// The ordering is store-defined and not guaranteed stable across calls
    /// if the table is concurrently mutated.
    pub async fn get_all_records(&self, table: &str, page: Page) -> Result<Vec<Record>> {
        let conn = self.store.open_read_only()?;
        ensure_table(&conn, table)?;

        let sql = format!("SELECT * FROM \"{table}\" LIMIT ?1 OFFSET ?2");
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

        let mut rows = stmt.query(params![page.limit, page.offset])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(store::row_to_record(&columns, row)?);
        }

        tracing::debug!(table, returned = records.len(), limit = page.limit, offset = page.offset, "scanned table");
        Ok(records)
    }

    /// Look up a single record by primary-key equality
    ///
    /// The comparison is attempted verbatim even if the key column's declared
    /// type is not integer; callers supply a value of the correct shape.
    pub async fn get_record(&self, table: &str, id: i64) -> Result<Record> {
        let conn = self.store.open_read_only()?;
        ensure_table(&conn, table)?;
        let key = catalog::primary_key_of(&conn, table)?;

        let sql = format!("SELECT * FROM \"{table}\" WHERE \"{key}\" = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => store::row_to_record(&columns, row),
            None => Err(TabulaError::record_not_found(table, key, id)),
        }
    }

    /// Insert a row using exactly the columns present in `data`, in the
    /// order supplied; returns the store-assigned key
    pub async fn create_record(&self, table: &str, data: &Record) -> Result<CreateResult> {
        let conn = self.store.open()?;
        ensure_table(&conn, table)?;
        if data.is_empty() {
            return Err(TabulaError::validation("create_record requires at least one column value"));
        }

        let schema = catalog::columns_of(&conn, table)?;
        ensure_known_columns(&schema, data, table)?;

        let column_sql: Vec<String> = data.keys().map(|k| format!("\"{k}\"")).collect();
        let placeholders: Vec<String> = (1..=data.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO \"{table}\" ({}) VALUES ({})",
            column_sql.join(", "),
            placeholders.join(", ")
        );

        let values = data.values().map(store::json_to_sql).collect::<Result<Vec<_>>>()?;
        conn.execute(&sql, params_from_iter(values))?;
        let id = conn.last_insert_rowid();

        tracing::info!(table, id, "created record");
        Ok(CreateResult { id })
    }

    /// Apply a column-by-column assignment to the row matching the primary key
    pub async fn update_record(&self, table: &str, id: i64, data: &Record) -> Result<UpdateResult> {
        let conn = self.store.open()?;
        ensure_table(&conn, table)?;
        if data.is_empty() {
            return Err(TabulaError::validation("update_record requires at least one column value"));
        }

        let schema = catalog::columns_of(&conn, table)?;
        ensure_known_columns(&schema, data, table)?;
        let key = schema
            .first()
            .map(|c| c.name.clone())
            .ok_or_else(|| TabulaError::empty_schema(table))?;

        let assignments: Vec<String> = data
            .keys()
            .enumerate()
            .map(|(i, k)| format!("\"{k}\" = ?{}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE \"{table}\" SET {} WHERE \"{key}\" = ?{}",
            assignments.join(", "),
            data.len() + 1
        );

        let mut values = data.values().map(store::json_to_sql).collect::<Result<Vec<_>>>()?;
        values.push(rusqlite::types::Value::Integer(id));
        let affected = conn.execute(&sql, params_from_iter(values))?;
        if affected == 0 {
            return Err(TabulaError::record_not_found(table, key, id));
        }

        tracing::info!(table, id, "updated record");
        Ok(UpdateResult { updated: true })
    }

    /// Delete the row matching the primary key
    ///
    /// Re-deleting an already-deleted id fails with `RecordNotFound` again —
    /// deterministically, with no side effects.
    pub async fn delete_record(&self, table: &str, id: i64) -> Result<DeleteResult> {
        let conn = self.store.open()?;
        ensure_table(&conn, table)?;
        let key = catalog::primary_key_of(&conn, table)?;

        let sql = format!("DELETE FROM \"{table}\" WHERE \"{key}\" = ?1");
        let affected = conn.execute(&sql, params![id])?;
        if affected == 0 {
            return Err(TabulaError::record_not_found(table, key, id));
        }

        tracing::info!(table, id, "deleted record");
        Ok(DeleteResult { deleted: true })
    }
}

/// Validate a table name against the live catalog before anything else
fn ensure_table(conn: &Connection, table: &str) -> Result<()> {
    if catalog::table_exists(conn, table)? {
        Ok(())
    } else {
        Err(TabulaError::unknown_table(table))
    }
}

/// Validate that every column in `data` exists in the live schema
///
/// Column names are interpolated into statements afterwards, so nothing
/// unvalidated may pass this point.
fn ensure_known_columns(schema: &[ColumnDef], data: &Record, table: &str) -> Result<()> {
    for name in data.keys() {
        if !schema.iter().any(|c| &c.name == name) {
            return Err(TabulaError::validation(format!(
                "unknown column \"{name}\" for table {table}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a temp store with an Artist table and two rows
    fn create_test_store() -> std::path::PathBuf {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let thread_id = std::thread::current().id();
        let temp_file = std::env::temp_dir().join(format!("tabula_engine_{thread_id:?}_{id}.db"));
        let _ = std::fs::remove_file(&temp_file);

        {
            let conn = Connection::open(&temp_file).expect("Failed to create temp database");
            conn.execute(
                "CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY, Name NVARCHAR(120))",
                [],
            )
            .expect("Failed to create table");
            conn.execute("INSERT INTO Artist (Name) VALUES ('AC/DC')", []).expect("insert");
            conn.execute("INSERT INTO Artist (Name) VALUES ('Accept')", []).expect("insert");
        }

        temp_file
    }

    fn record(pairs: &[(&str, serde_json::Value)]) -> Record {
        let mut data = Record::new();
        for (k, v) in pairs {
            data.insert((*k).to_string(), v.clone());
        }
        data
    }

    #[tokio::test]
    async fn test_list_tables() {
        let file = create_test_store();
        let engine = CrudEngine::new(StoreConfig::new(&file));

        let tables = engine.list_tables().await.unwrap();
        assert_eq!(tables, vec!["Artist"]);

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn test_get_all_records_window() {
        let file = create_test_store();
        let engine = CrudEngine::new(StoreConfig::new(&file));

        let records = engine.get_all_records("Artist", Page::default()).await.unwrap();
        assert_eq!(records.len(), 2);

        let windowed = engine.get_all_records("Artist", Page::new(1, 1)).await.unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0]["Name"], serde_json::json!("Accept"));

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn test_get_record_found_and_missing() {
        let file = create_test_store();
        let engine = CrudEngine::new(StoreConfig::new(&file));

        let record = engine.get_record("Artist", 1).await.unwrap();
        assert_eq!(record["ArtistId"], serde_json::json!(1));
        assert_eq!(record["Name"], serde_json::json!("AC/DC"));

        let err = engine.get_record("Artist", 999).await.unwrap_err();
        assert_eq!(err.kind(), "RECORD_NOT_FOUND");

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn test_create_update_delete_cycle() {
        let file = create_test_store();
        let engine = CrudEngine::new(StoreConfig::new(&file));

        let created = engine
            .create_record("Artist", &record(&[("Name", serde_json::json!("New Artist"))]))
            .await
            .unwrap();
        assert_eq!(created.id, 3);

        let updated = engine
            .update_record("Artist", created.id, &record(&[("Name", serde_json::json!("Renamed"))]))
            .await
            .unwrap();
        assert!(updated.updated);

        let fetched = engine.get_record("Artist", created.id).await.unwrap();
        assert_eq!(fetched["Name"], serde_json::json!("Renamed"));

        let deleted = engine.delete_record("Artist", created.id).await.unwrap();
        assert!(deleted.deleted);

        let err = engine.get_record("Artist", created.id).await.unwrap_err();
        assert_eq!(err.kind(), "RECORD_NOT_FOUND");

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn test_unknown_table_checked_first() {
        let file = create_test_store();
        let engine = CrudEngine::new(StoreConfig::new(&file));

        let err = engine.get_all_records("Ghost", Page::default()).await.unwrap_err();
        assert_eq!(err.kind(), "UNKNOWN_TABLE");

        // even with an empty payload, the table check runs first
        let err = engine.create_record("Ghost", &Record::new()).await.unwrap_err();
        assert_eq!(err.kind(), "UNKNOWN_TABLE");

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn test_empty_data_is_validation_error() {
        let file = create_test_store();
        let engine = CrudEngine::new(StoreConfig::new(&file));

        let err = engine.create_record("Artist", &Record::new()).await.unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");

        let err = engine.update_record("Artist", 1, &Record::new()).await.unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn test_unknown_column_is_validation_error() {
        let file = create_test_store();
        let engine = CrudEngine::new(StoreConfig::new(&file));

        let err = engine
            .create_record("Artist", &record(&[("Bogus", serde_json::json!("x"))]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
        assert!(err.message().contains("Bogus"));

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let file = create_test_store();
        let engine = CrudEngine::new(StoreConfig::new(&file));

        let err = engine
            .update_record("Artist", 999, &record(&[("Name", serde_json::json!("x"))]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "RECORD_NOT_FOUND");

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn test_delete_is_idempotently_not_found() {
        let file = create_test_store();
        let engine = CrudEngine::new(StoreConfig::new(&file));

        engine.delete_record("Artist", 2).await.unwrap();

        let first = engine.delete_record("Artist", 2).await.unwrap_err();
        let second = engine.delete_record("Artist", 2).await.unwrap_err();
        assert_eq!(first.kind(), "RECORD_NOT_FOUND");
        assert_eq!(second.kind(), "RECORD_NOT_FOUND");

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn test_not_null_violation_is_store_error() {
        let file = create_test_store();
        {
            let conn = Connection::open(&file).expect("open");
            conn.execute(
                "CREATE TABLE Strict (StrictId INTEGER PRIMARY KEY, Label TEXT NOT NULL)",
                [],
            )
            .expect("create");
        }
        let engine = CrudEngine::new(StoreConfig::new(&file));

        let err = engine
            .create_record("Strict", &record(&[("Label", serde_json::Value::Null)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "STORE_ERROR");

        let _ = std::fs::remove_file(&file);
    }
}
