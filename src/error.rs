//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout Tabula.
//! All errors are structured and map to stable error kinds for JSON output.
//!
//! # Error Taxonomy
//! - `UnknownTable`: table absent from the live catalog
//! - `EmptySchema`: a table exists but reports zero columns (defensive)
//! - `RecordNotFound`: zero rows matched/affected on a keyed operation
//! - `Validation`: caller supplied an empty or malformed argument shape
//! - `Store`: underlying constraint violation or connectivity failure
//! - `Config`: configuration file or store registry errors
//!
//! "No match" from the command interpreter is deliberately NOT part of this
//! taxonomy: it is a normal outcome, modeled on the reply side, not an error.

use thiserror::Error;

/// Main error type for Tabula operations
#[derive(Error, Debug)]
pub enum TabulaError {
    /// Table absent from the live catalog
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Table exists but reports no columns; should not occur against a
    /// well-formed store
    #[error("Table {0} reports no columns")]
    EmptySchema(String),

    /// Zero rows matched or were affected on a keyed operation
    #[error("Record not found: {table} has no row with {key} = {id}")]
    RecordNotFound { table: String, key: String, id: i64 },

    /// Caller supplied an empty or malformed argument shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// Underlying store rejected the operation (constraint violation,
    /// connectivity failure, malformed statement)
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error (file not found, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TabulaError {
    /// Convert error to its stable kind string for JSON output
    ///
    /// Kinds are stable and suitable for programmatic handling by callers,
    /// so "table does not exist" can be told apart from "record does not
    /// exist" and "store rejected the write".
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTable(_) => "UNKNOWN_TABLE",
            Self::EmptySchema(_) => "EMPTY_SCHEMA",
            Self::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Get the human-readable error message
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create an unknown-table error
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable(table.into())
    }

    /// Create an empty-schema error
    pub fn empty_schema(table: impl Into<String>) -> Self {
        Self::EmptySchema(table.into())
    }

    /// Create a record-not-found error
    pub fn record_not_found(table: impl Into<String>, key: impl Into<String>, id: i64) -> Self {
        Self::RecordNotFound { table: table.into(), key: key.into(), id }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<rusqlite::Error> for TabulaError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(err.to_string())
    }
}

/// Result type alias for Tabula operations
pub type Result<T> = std::result::Result<T, TabulaError>;
