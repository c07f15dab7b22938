//! subsign command-line caller
//!
//! Runs one signature pipeline invocation from a JSON request.
//!
//! ```bash
//! subsign-cli send --config subsign.json --request request.json
//! echo '{"document_id": "d1", "subscription_id": "s1"}' | subsign-cli send --config subsign.json --request -
//! subsign-cli migrate --config subsign.json
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use subsign::db::Database;
use subsign::pipeline::NoopProgress;
use subsign::{load_config, Config, Pipeline, SigningRequest};

#[derive(Parser, Debug)]
#[command(name = "subsign-cli")]
#[command(about = "Send subscription pack documents out for e-signature")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the signature pipeline for one document
    Send {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Path to the JSON request, or `-` for stdin
        #[arg(short, long)]
        request: String,
    },
    /// Create or upgrade the database schema
    Migrate {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Command::Send { config, request } => {
            let config = setup(&config)?;
            let request = read_request(&request)?;
            let db = open_database(&config)?;
            let pipeline = Pipeline::from_config(db, &config)
                .context("Failed to build the signature pipeline")?;

            match pipeline.run(request, &NoopProgress) {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    let body = e.to_body();
                    error!(kind = %body.kind, status = body.status, "Request failed");
                    println!("{}", serde_json::to_string_pretty(&body)?);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Migrate { config } => {
            let config = setup(&config)?;
            open_database(&config)?;
            info!("Database schema is up to date");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads the configuration and installs logging.
fn setup(path: &Path) -> Result<Config> {
    let config = load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    subsign::logging::init(&config.logging).context("Failed to initialise logging")?;
    info!(config = %path.display(), "Configuration loaded");
    Ok(config)
}

fn open_database(config: &Config) -> Result<Database> {
    let path = config
        .database
        .resolved_path()
        .context("No database path configured and no home directory found")?;
    Database::open(&path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn read_request(source: &str) -> Result<SigningRequest> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read request file {}", source))?
    };
    serde_json::from_str(&raw).context("Request is not a valid signing request")
}
