//! Schema Catalog
//!
//! Live, queryable metadata about the store: which tables exist and, per
//! table, an ordered column list with declared types. Every call re-queries
//! the store — there is no snapshot isolation, and the schema may change
//! between calls.
//!
//! # Primary Key Convention
//! The first column of a table's schema is treated as its primary key. This
//! is a convention inferred from metadata ordering, not a declared
//! constraint, so it is derived fresh from `columns_of` on every lookup and
//! never cached.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabulaError};

/// Primitive value type of a column, derived from the declared type via
/// SQLite's type-affinity rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
    /// No declared type at all
    Null,
}

impl ColumnType {
    /// Derive the primitive type from a declared column type
    ///
    /// Follows SQLite's affinity rules in their documented order; the
    /// NUMERIC affinity group (DECIMAL, DATETIME, BOOLEAN, ...) is reported
    /// as `Real`.
    #[must_use]
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        if upper.is_empty() {
            Self::Null
        } else if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else if upper.contains("BLOB") {
            Self::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Real
        }
    }

    /// Get the type name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Blob => "blob",
            Self::Null => "null",
        }
    }
}

/// One column of a table schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,

    /// Declared type as written in the table definition
    pub declared_type: String,

    /// Primitive type derived from the declared type
    pub column_type: ColumnType,

    /// Whether the column carries a NOT NULL constraint
    pub not_null: bool,

    /// Default value expression (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// List all user tables in store-native order
///
/// Internal `sqlite_%` tables are excluded. The order is whatever the store
/// reports — not guaranteed sorted.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")
        .map_err(|e| TabulaError::store(format!("failed to query tables: {e}")))?;

    let tables = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| TabulaError::store(format!("failed to fetch table names: {e}")))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(tables)
}

/// Check whether a table exists in the live catalog
///
/// Comparison is a case-sensitive exact match against the table list.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    Ok(list_tables(conn)?.iter().any(|t| t == table))
}

/// Ordered column schema of a table
///
/// Fails with `UnknownTable` if the table is absent at query time.
pub fn columns_of(conn: &Connection, table: &str) -> Result<Vec<ColumnDef>> {
    if !table_exists(conn, table)? {
        return Err(TabulaError::unknown_table(table));
    }

    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(\"{table}\")"))
        .map_err(|e| TabulaError::store(format!("failed to describe {table}: {e}")))?;

    let columns = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let declared: String = row.get(2)?;
            let not_null: i64 = row.get(3)?;
            let default_value: Option<String> = row.get(4)?;
            Ok(ColumnDef {
                name,
                column_type: ColumnType::from_declared(&declared),
                declared_type: declared,
                not_null: not_null != 0,
                default_value,
            })
        })
        .map_err(|e| TabulaError::store(format!("failed to query columns of {table}: {e}")))?
        .collect::<std::result::Result<Vec<ColumnDef>, _>>()?;

    tracing::debug!(table, columns = columns.len(), "introspected table");
    Ok(columns)
}

/// Name of a table's primary-key column: the first entry of its schema
///
/// Fails with `UnknownTable` if the table is absent, `EmptySchema` if it
/// reports zero columns.
pub fn primary_key_of(conn: &Connection, table: &str) -> Result<String> {
    let columns = columns_of(conn, table)?;
    columns
        .into_iter()
        .next()
        .map(|c| c.name)
        .ok_or_else(|| TabulaError::empty_schema(table))
}
