//! `joydb` subcommand CLI: a thin adapter over [`joydb_engine::Engine`]
//! for scripting and ad hoc database administration. One statement per
//! invocation — the interactive terminal front-end and the JSON
//! network server are separate, out-of-scope collaborators built on
//! the same façade.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use joydb_engine::{Engine, ExecutionResult, Registry, RegistryConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "joydb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding every database's snapshot and WAL file.
    #[arg(short, long, env = "JOYDB_DATA_DIR", default_value = "joydb-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty database.
    CreateDatabase { name: String },
    /// Drop a database and delete its on-disk files.
    DropDatabase { name: String },
    /// Run one SQL statement against a database and print the result.
    Query {
        /// Database to select before running the statement.
        #[arg(short, long)]
        database: String,
        /// The SQL statement text.
        sql: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let registry = Arc::new(Registry::new(RegistryConfig {
        base_path: cli.data_dir,
    }));
    let engine = Engine::new(Arc::clone(&registry));

    let outcome = run(&engine, cli.command);
    if let Err(err) = registry.close_all() {
        error!(error = %err, "failed to close databases cleanly");
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(engine: &Engine, command: Commands) -> joydb_engine::Result<()> {
    match command {
        Commands::CreateDatabase { name } => {
            engine.registry().create(&name)?;
            println!("created database '{name}'");
            Ok(())
        }
        Commands::DropDatabase { name } => {
            engine.registry().drop_database(&name)?;
            println!("dropped database '{name}'");
            Ok(())
        }
        Commands::Query { database, sql } => {
            let mut session = engine.session();
            session.execute(&format!("USE DATABASE {database}"))?;
            print_result(&session.execute(&sql)?);
            Ok(())
        }
    }
}

fn print_result(result: &ExecutionResult) {
    match result {
        ExecutionResult::Rows { columns, rows } => {
            println!("{}", columns.join(" | "));
            for row in rows {
                let json = row.to_json();
                let values: Vec<String> = columns
                    .iter()
                    .map(|c| json.get(c).map_or_else(|| "NULL".to_string(), serde_json::Value::to_string))
                    .collect();
                println!("{}", values.join(" | "));
            }
            println!("({} row(s))", rows.len());
        }
        ExecutionResult::RowsAffected(count) => println!("{count} row(s) affected"),
        ExecutionResult::Message(message) => println!("{message}"),
    }
}
