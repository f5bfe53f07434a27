//! Administrative commands: remote schema diagnostics, local database
//! bootstrap and the prompt-manager regex repair.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tracker::config::{load_dotenv, SupabaseConfig};
use tracker::db::{create_pool, setup_local_schema};
use tracker::inspect::{self, render_report, InspectError, Report};
use tracker::repair::{repair_file, DEFAULT_TARGET};
use tracker::supabase::SupabaseClient;

#[derive(Parser)]
#[command(name = "tracker-admin")]
#[command(about = "Diagnostics and maintenance for the application tracker database")]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count rows in tracks_applicationrecord and print the first record
    CheckTable,
    /// Print column metadata from the get_table_columns RPC
    CheckSchema,
    /// List public tables (list_tables RPC, falling back to a raw query)
    ListTables,
    /// Print table columns (raw query, falling back to a sampled record)
    InspectTable,
    /// Create the local SQLite jobs table if it does not exist
    SetupDb {
        /// SQLite database file
        #[arg(long, default_value = "data/jobs.db")]
        path: PathBuf,
    },
    /// Re-escape a UUID that was pasted into a regex escape sequence
    FixRegex {
        /// File to repair
        #[arg(long, default_value = DEFAULT_TARGET)]
        file: PathBuf,
    },
}

#[derive(Clone, Copy)]
enum Inspection {
    CheckTable,
    CheckSchema,
    ListTables,
    InspectTable,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries the command's output only.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    load_dotenv(cli.env_file.as_deref())?;

    match cli.command {
        Command::CheckTable => run_inspection(Inspection::CheckTable).await,
        Command::CheckSchema => run_inspection(Inspection::CheckSchema).await,
        Command::ListTables => run_inspection(Inspection::ListTables).await,
        Command::InspectTable => run_inspection(Inspection::InspectTable).await,
        Command::SetupDb { path } => setup_db(path).await,
        Command::FixRegex { file } => fix_regex(file),
    }
}

/// Connects to Supabase and runs one diagnostic. Missing credentials abort;
/// query failures are logged and the command exits normally.
async fn run_inspection(inspection: Inspection) -> Result<()> {
    let config = SupabaseConfig::from_env()?;
    let client = SupabaseClient::new(&config)?;

    let result: Result<Report, InspectError> = match inspection {
        Inspection::CheckTable => inspect::check_table(&client).await,
        Inspection::CheckSchema => inspect::check_table_schema(&client).await,
        Inspection::ListTables => inspect::list_tables(&client).await,
        Inspection::InspectTable => inspect::inspect_table(&client).await,
    };

    match result {
        Ok(report) => println!("{}", render_report(&report)),
        Err(InspectError::FallbackExhausted { primary, fallback }) => {
            error!("Primary query failed: {primary}");
            error!("Fallback query failed: {fallback}");
        }
        Err(e) => error!("{e}"),
    }
    Ok(())
}

async fn setup_db(path: PathBuf) -> Result<()> {
    let url = format!("sqlite://{}", path.display());
    let pool = create_pool(&url).await?;
    setup_local_schema(&pool).await?;
    pool.close().await;

    println!("Database setup completed: {}", path.display());
    Ok(())
}

fn fix_regex(file: PathBuf) -> Result<()> {
    info!("Checking {} for corrupted regex escapes", file.display());
    match repair_file(&file)? {
        0 => println!("No corrupted regex found - file might already be fixed"),
        n => println!("Fixed {n} corrupted regex escape(s) in {}", file.display()),
    }
    Ok(())
}
