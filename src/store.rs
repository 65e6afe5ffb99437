//! Store Handle and Value Conversion
//!
//! The store is a single SQLite database file. Connections are scoped to one
//! operation: opened, used, and released by drop on every exit path — no
//! persistent connection is maintained and no handle can leak on validation
//! failure.
//!
//! # Value Domain
//! Record values are null, integer, real, text, or blob. BLOB data is
//! Base64-encoded on the way out for JSON safety. Inbound JSON booleans are
//! coerced to integers (SQLite has no boolean storage class); nested arrays
//! and objects are rejected.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};

use crate::error::{Result, TabulaError};

/// One row of a table: a flat column → value mapping.
///
/// Backed by `serde_json::Map` with `preserve_order`, so iteration order is
/// insertion order — the order columns were supplied (inbound) or the store's
/// column order (outbound).
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Handle to a SQLite store file
#[derive(Debug, Clone)]
pub struct StoreConfig {
    file: PathBuf,
}

impl StoreConfig {
    /// Create a store handle for a database file
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    /// Path of the underlying database file
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Open a read-write connection scoped to one operation
    pub fn open(&self) -> Result<Connection> {
        open_connection(&self.file, false)
    }

    /// Open a read-only connection scoped to one operation
    pub fn open_read_only(&self) -> Result<Connection> {
        open_connection(&self.file, true)
    }
}

/// Open a SQLite connection with appropriate flags
fn open_connection(path: &Path, read_only: bool) -> Result<Connection> {
    let flags = if read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    };

    Connection::open_with_flags(path, flags).map_err(|e| {
        TabulaError::store(format!("failed to open store {}: {e}", path.display()))
    })
}

/// Convert one result row into a `Record`, preserving column order
pub fn row_to_record(columns: &[String], row: &Row) -> Result<Record> {
    let mut record = Record::new();
    for (idx, name) in columns.iter().enumerate() {
        let value_ref = row
            .get_ref(idx)
            .map_err(|e| TabulaError::store(format!("failed to read column {name}: {e}")))?;
        record.insert(name.clone(), value_to_json(value_ref)?);
    }
    Ok(record)
}

/// Convert a SQLite value to a JSON value
pub fn value_to_json(value: ValueRef<'_>) -> Result<serde_json::Value> {
    Ok(match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number), // NaN/Infinity as null
        ValueRef::Text(s) => {
            let text = std::str::from_utf8(s)
                .map_err(|e| TabulaError::store(format!("non-UTF-8 text value: {e}")))?;
            serde_json::Value::String(text.to_string())
        }
        ValueRef::Blob(b) => {
            // Encode BLOB as Base64 for JSON safety
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(b);
            serde_json::Value::String(encoded)
        }
    })
}

/// Convert a JSON value into a bindable SQLite value
///
/// Every caller-supplied value goes through here and is bound as a statement
/// parameter — never interpolated into SQL text.
pub fn json_to_sql(value: &serde_json::Value) -> Result<rusqlite::types::Value> {
    use rusqlite::types::Value;

    match value {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Real(f))
            } else {
                Err(TabulaError::validation(format!("unrepresentable number: {n}")))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(TabulaError::validation(
            "nested arrays/objects are not supported as record values".to_string(),
        )),
    }
}
