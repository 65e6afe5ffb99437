//! Invocation Bridge
//!
//! The seam between the core and whatever surface discovers and invokes
//! operations — a CLI, an interactive loop, or a remote transport. The
//! bridge adapts an operation name plus argument map into a call against the
//! CRUD engine and wraps the outcome in a serialized envelope. It never
//! retries and never mutates arguments.
//!
//! "No match" from the interpreter is a normal, expected outcome here (ask
//! the user to rephrase), not an engine failure.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::engine::{CrudEngine, Page, DEFAULT_SCAN_LIMIT};
use crate::error::{Result, TabulaError};
use crate::interpret::Command;
use crate::output::{ErrorEnvelope, Metadata, SuccessEnvelope};
use crate::store::Record;

/// Operation names currently exposed, in a fixed order.
///
/// This is the live availability set handed to the interpreter; a deployment
/// that disables an operation passes a reduced slice and the matching rule
/// groups no-op.
pub const OPERATIONS: &[&str] = &[
    "list_tables",
    "get_all_records",
    "get_record",
    "create_record",
    "update_record",
    "delete_record",
];

/// Guidance shown to the user when no operation matched their input
pub const NO_MATCH_MESSAGE: &str =
    "No operation matched the input. Try rephrasing, e.g. \"Get all records from Artist limit 5\".";

// ============================================================================
// Argument Shapes
// ============================================================================

/// Arguments for `list_tables` (none)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListTablesArgs {}

/// Arguments for `get_all_records`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetAllRecordsArgs {
    /// Name of the table to scan
    pub table_name: String,
    /// Maximum number of records to return (default: 100)
    #[serde(default)]
    pub limit: Option<i64>,
    /// Number of records to skip (default: 0)
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Arguments for `get_record`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetRecordArgs {
    /// Name of the table
    pub table_name: String,
    /// Primary-key value of the record to retrieve
    pub record_id: i64,
}

/// Arguments for `create_record`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateRecordArgs {
    /// Name of the table
    pub table_name: String,
    /// Column → value payload for the new record
    pub data: Record,
}

/// Arguments for `update_record`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateRecordArgs {
    /// Name of the table
    pub table_name: String,
    /// Primary-key value of the record to update
    pub record_id: i64,
    /// Column → value payload; only the supplied columns are replaced
    pub data: Record,
}

/// Arguments for `delete_record`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteRecordArgs {
    /// Name of the table
    pub table_name: String,
    /// Primary-key value of the record to delete
    pub record_id: i64,
}

// ============================================================================
// Operation Descriptors
// ============================================================================

/// Descriptor of one operation: name, description and input schema
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: schemars::schema::RootSchema,
}

/// Descriptors for every exposed operation, in [`OPERATIONS`] order
#[must_use]
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "list_tables",
            description: "List all available tables in the database",
            input_schema: schema_for!(ListTablesArgs),
        },
        ToolSpec {
            name: "get_all_records",
            description: "Get all records from a specific table",
            input_schema: schema_for!(GetAllRecordsArgs),
        },
        ToolSpec {
            name: "get_record",
            description: "Get a specific record by ID from a table",
            input_schema: schema_for!(GetRecordArgs),
        },
        ToolSpec {
            name: "create_record",
            description: "Create a new record in a table",
            input_schema: schema_for!(CreateRecordArgs),
        },
        ToolSpec {
            name: "update_record",
            description: "Update an existing record in a table",
            input_schema: schema_for!(UpdateRecordArgs),
        },
        ToolSpec {
            name: "delete_record",
            description: "Delete a record from a table",
            input_schema: schema_for!(DeleteRecordArgs),
        },
    ]
}

/// Build a [`Command`] from an operation name and a JSON argument map
///
/// This is the entry point an external transport uses after tool discovery.
/// Engine-side defaults (limit 100, offset 0) apply to omitted pagination
/// fields — unlike the interpreter's conversational default.
pub fn command_from_args(operation: &str, args: serde_json::Value) -> Result<Command> {
    match operation {
        "list_tables" => Ok(Command::ListTables),
        "get_all_records" => {
            let args: GetAllRecordsArgs = parse_args(args)?;
            Ok(Command::GetAllRecords {
                table_name: args.table_name,
                limit: args.limit.unwrap_or(DEFAULT_SCAN_LIMIT),
                offset: args.offset.unwrap_or(0),
            })
        }
        "get_record" => {
            let args: GetRecordArgs = parse_args(args)?;
            Ok(Command::GetRecord { table_name: args.table_name, record_id: args.record_id })
        }
        "create_record" => {
            let args: CreateRecordArgs = parse_args(args)?;
            Ok(Command::CreateRecord { table_name: args.table_name, data: args.data })
        }
        "update_record" => {
            let args: UpdateRecordArgs = parse_args(args)?;
            Ok(Command::UpdateRecord {
                table_name: args.table_name,
                record_id: args.record_id,
                data: args.data,
            })
        }
        "delete_record" => {
            let args: DeleteRecordArgs = parse_args(args)?;
            Ok(Command::DeleteRecord { table_name: args.table_name, record_id: args.record_id })
        }
        other => Err(TabulaError::validation(format!("unknown operation: {other}"))),
    }
}

fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| TabulaError::validation(format!("invalid arguments: {e}")))
}

// ============================================================================
// Dispatch
// ============================================================================

/// Outcome of one dispatch: a success envelope, an error envelope, or the
/// normal "ask the user to rephrase" case
#[derive(Debug)]
pub enum Reply {
    Success(SuccessEnvelope<serde_json::Value>),
    Failure(ErrorEnvelope),
    NoMatch,
}

impl Reply {
    /// Whether this reply is NOT an engine failure (`NoMatch` counts as ok)
    #[must_use]
    pub const fn ok(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }

    /// Whether the interpreter produced nothing to dispatch
    #[must_use]
    pub const fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }

    /// Serialize the reply for output
    pub fn to_value(&self) -> Result<serde_json::Value> {
        match self {
            Self::Success(envelope) => to_value(envelope),
            Self::Failure(envelope) => to_value(envelope),
            Self::NoMatch => {
                Ok(serde_json::json!({ "ok": true, "no_match": true, "message": NO_MATCH_MESSAGE }))
            }
        }
    }
}

/// Forward a command to the engine and wrap the outcome
///
/// `None` produces [`Reply::NoMatch`]. Engine failures pass through with
/// their kind and message unmodified; nothing is retried.
pub async fn dispatch(engine: &CrudEngine, command: Option<Command>) -> Reply {
    let Some(command) = command else {
        return Reply::NoMatch;
    };

    let operation = command.operation();
    let start = Instant::now();
    let outcome = run(engine, command).await;
    let execution_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok((data, rows_returned)) => {
            let meta = match rows_returned {
                Some(rows) => Metadata::with_rows(execution_ms, rows),
                None => Metadata::new(execution_ms),
            };
            Reply::Success(SuccessEnvelope::new(operation, data, meta))
        }
        Err(err) => Reply::Failure(ErrorEnvelope::from_error(operation, &err)),
    }
}

/// Call the engine method named by the command
async fn run(engine: &CrudEngine, command: Command) -> Result<(serde_json::Value, Option<usize>)> {
    match command {
        Command::ListTables => {
            let tables = engine.list_tables().await?;
            let count = tables.len();
            Ok((serde_json::json!({ "tables": tables }), Some(count)))
        }
        Command::GetAllRecords { table_name, limit, offset } => {
            let records = engine.get_all_records(&table_name, Page::new(limit, offset)).await?;
            let count = records.len();
            Ok((to_value(&records)?, Some(count)))
        }
        Command::GetRecord { table_name, record_id } => {
            let record = engine.get_record(&table_name, record_id).await?;
            Ok((to_value(&record)?, Some(1)))
        }
        Command::CreateRecord { table_name, data } => {
            let result = engine.create_record(&table_name, &data).await?;
            Ok((to_value(&result)?, None))
        }
        Command::UpdateRecord { table_name, record_id, data } => {
            let result = engine.update_record(&table_name, record_id, &data).await?;
            Ok((to_value(&result)?, None))
        }
        Command::DeleteRecord { table_name, record_id } => {
            let result = engine.delete_record(&table_name, record_id).await?;
            Ok((to_value(&result)?, None))
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| TabulaError::store(format!("failed to serialize result: {e}")))
}
