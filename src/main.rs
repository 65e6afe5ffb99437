//! Tabula CLI Entry Point
//!
//! Subcommands cover the store-facing operations (`tables`, `describe`,
//! `records`), the interpreter path (`ask`, `repl`), operation discovery
//! (`tools`) and store registration (`save-store`).
//!
//! All output to stdout is JSON. Logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use tabula::{bridge, catalog, config, interpret};
use tabula::{Command, CrudEngine, ErrorEnvelope, Metadata, Page, StoreConfig, SuccessEnvelope, TabulaError};

/// Tabula - Schema-driven CRUD for SQLite with a rule-based command interpreter
#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Schema-driven CRUD engine with a rule-based command interpreter for SQLite databases")]
#[command(version)]
struct Cli {
    /// Database file to operate on (overrides any saved store)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Named store from the local or global registry
    #[arg(long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tables in the store
    Tables,

    /// Show a table's column schema and derived primary key
    Describe {
        /// Table name (case-sensitive)
        table: String,
    },

    /// Scan records from a table
    Records {
        /// Table name (case-sensitive)
        table: String,
        /// Maximum number of records to return
        #[arg(long)]
        limit: Option<i64>,
        /// Number of records to skip
        #[arg(long)]
        offset: Option<i64>,
    },

    /// Interpret a free-form command and run it
    Ask {
        /// The utterance, e.g. "Get all records from Artist limit 5"
        text: Vec<String>,
    },

    /// Interactive command loop
    Repl,

    /// Print the operation descriptors as JSON
    Tools,

    /// List saved stores from the local and global registries
    Stores,

    /// Save a store file under a name in the local or global registry
    SaveStore {
        /// Name for the store entry
        name: String,
        /// Database file path
        file: PathBuf,
        /// Save to the global registry instead of the local one
        #[arg(long)]
        global: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(err) => {
            let kind = err.downcast_ref::<TabulaError>().map_or("INTERNAL", TabulaError::kind);
            let envelope =
                serde_json::json!({ "ok": false, "error": { "kind": kind, "message": err.to_string() } });
            println!("{envelope:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Tables => {
            let engine = engine_for(&cli)?;
            emit(&bridge::dispatch(&engine, Some(Command::ListTables)).await)
        }

        Commands::Describe { table } => {
            let store = store_for(&cli)?;
            let started = Instant::now();
            match describe(&store, table) {
                Ok(data) => {
                    let envelope = SuccessEnvelope::new(
                        "describe_table",
                        data,
                        Metadata::new(started.elapsed().as_millis() as u64),
                    );
                    println!("{:#}", serde_json::to_value(&envelope)?);
                    Ok(0)
                }
                Err(err) => {
                    let envelope = ErrorEnvelope::from_error("describe_table", &err);
                    println!("{:#}", serde_json::to_value(&envelope)?);
                    Ok(1)
                }
            }
        }

        Commands::Records { table, limit, offset } => {
            let engine = engine_for(&cli)?;
            let page = Page::default();
            let command = Command::GetAllRecords {
                table_name: table.clone(),
                limit: limit.unwrap_or(page.limit),
                offset: offset.unwrap_or(page.offset),
            };
            emit(&bridge::dispatch(&engine, Some(command)).await)
        }

        Commands::Ask { text } => {
            let engine = engine_for(&cli)?;
            let utterance = text.join(" ");
            let command = interpret::interpret(&utterance, bridge::OPERATIONS);
            emit(&bridge::dispatch(&engine, command).await)
        }

        Commands::Repl => {
            let engine = engine_for(&cli)?;
            repl(&engine).await
        }

        Commands::Tools => {
            println!("{:#}", serde_json::to_value(bridge::tool_specs())?);
            Ok(0)
        }

        Commands::Stores => {
            let entries = config::list_stores(None)?;
            let data: Vec<serde_json::Value> = entries
                .into_iter()
                .map(|(name, store, scope)| {
                    serde_json::json!({ "name": name, "file": store.file, "scope": scope })
                })
                .collect();
            println!("{:#}", serde_json::Value::Array(data));
            Ok(0)
        }

        Commands::SaveStore { name, file, global } => {
            let location =
                if *global { config::ConfigLocation::Global } else { config::ConfigLocation::Local };
            config::save_store(None, name, file, location)?;
            println!("{:#}", serde_json::json!({ "ok": true, "saved": name, "file": file }));
            Ok(0)
        }
    }
}

/// Resolve the store: explicit --db wins, then the named/default registry entry
fn store_for(cli: &Cli) -> tabula::Result<StoreConfig> {
    if let Some(db) = &cli.db {
        return Ok(StoreConfig::new(db));
    }
    config::resolve_store(None, cli.store.as_deref())
}

fn engine_for(cli: &Cli) -> tabula::Result<CrudEngine> {
    Ok(CrudEngine::new(store_for(cli)?))
}

fn describe(store: &StoreConfig, table: &str) -> tabula::Result<serde_json::Value> {
    let conn = store.open_read_only()?;
    let columns = catalog::columns_of(&conn, table)?;
    let primary_key = catalog::primary_key_of(&conn, table)?;
    Ok(serde_json::json!({ "table": table, "primary_key": primary_key, "columns": columns }))
}

/// Print a reply to stdout; exit code 1 only for engine failures
fn emit(reply: &bridge::Reply) -> anyhow::Result<i32> {
    println!("{:#}", reply.to_value()?);
    Ok(if reply.ok() { 0 } else { 1 })
}

/// Interactive loop: interpret each line, announce the chosen operation,
/// run it, or ask the user to rephrase
async fn repl(engine: &CrudEngine) -> anyhow::Result<i32> {
    eprintln!("tabula repl - type a command, or \"exit\" to quit");
    eprintln!("examples:");
    eprintln!("  List tables");
    eprintln!("  Get all records from Artist limit 5");
    eprintln!("  Get record from Artist with id 1");
    eprintln!("  Create record in Artist with name: 'New Artist'");
    eprintln!("  Update record in Artist with id 1 name: 'Updated Artist'");
    eprintln!("  Delete record from Artist with id 1");

    loop {
        let input: String =
            dialoguer::Input::new().with_prompt("you").allow_empty(true).interact_text()?;
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        match interpret::interpret(line, bridge::OPERATIONS) {
            Some(command) => {
                eprintln!("-> {} {}", command.operation(), command.args());
                let reply = bridge::dispatch(engine, Some(command)).await;
                println!("{:#}", reply.to_value()?);
            }
            None => eprintln!("{}", bridge::NO_MATCH_MESSAGE),
        }
    }
    Ok(0)
}
