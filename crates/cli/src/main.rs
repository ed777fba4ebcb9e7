//! Polyconf command line tool

use anyhow::{Context, Result};
use clap::Parser;
use std::{env, process};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;

use app::{Application, Cli};

fn main() {
    // Load .env file if it exists
    let dotenv = dotenv::dotenv();

    if let Err(err) = init_logging() {
        eprintln!("error: {err:#}");
        process::exit(1);
    }

    match dotenv {
        Ok(path) => debug!("Loaded environment variables from {}", path.display()),
        Err(e) if !e.not_found() => warn!("Could not load .env file: {}", e),
        Err(_) => {}
    }

    let cli = Cli::parse();
    debug!(command = ?cli.command, "Running polyconf v{}", env!("CARGO_PKG_VERSION"));

    match Application::new(cli).run() {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    }
}

/// Initialize logging based on environment variables
///
/// Logs go to standard error so they never mix with command output.
fn init_logging() -> Result<()> {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
    }

    debug!(level = %log_level, format = %log_format, "Logging initialized");
    Ok(())
}
