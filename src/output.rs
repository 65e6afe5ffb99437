//! JSON Output Envelope Types
//!
//! This module defines the structured JSON output format for all Tabula
//! operations. Every operation returns either a `SuccessEnvelope` or an
//! `ErrorEnvelope` — a failure is never a silent empty success.
//!
//! # Output Contract
//! - Success: `{"ok": true, "operation": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "operation": "...", "error": {"kind": "...", "message": "..."}}`
//!
//! Output is stable and suitable for programmatic parsing by callers.

use serde::{Deserialize, Serialize};

use crate::error::TabulaError;

/// Success envelope for operation results
///
/// Generic over the data type to support different operation return values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Operation that was executed (list_tables, get_record, ...)
    pub operation: String,

    /// Operation-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    /// Create a new success envelope
    pub fn new(operation: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, operation: operation.into(), data, meta }
    }
}

/// Error envelope for operation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Operation that was attempted
    pub operation: String,

    /// Error information
    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    /// Create a new error envelope
    pub fn new(operation: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, operation: operation.into(), error }
    }

    /// Create an error envelope from a `TabulaError`, kind and message
    /// passed through verbatim
    pub fn from_error(operation: impl Into<String>, err: &TabulaError) -> Self {
        Self::new(operation, ErrorInfo { kind: err.kind().to_string(), message: err.message() })
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error kind (e.g., "UNKNOWN_TABLE", "RECORD_NOT_FOUND")
    pub kind: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorInfo {
    /// Create a new error info
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into() }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,

    /// Number of rows returned (for record results, None for other operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_returned: Option<usize>,
}

impl Metadata {
    /// Create new metadata with just execution time
    #[must_use]
    pub fn new(execution_ms: u64) -> Self {
        Self { execution_ms, rows_returned: None }
    }

    /// Create new metadata with execution time and row count
    #[must_use]
    pub fn with_rows(execution_ms: u64, rows_returned: usize) -> Self {
        Self { execution_ms, rows_returned: Some(rows_returned) }
    }
}
