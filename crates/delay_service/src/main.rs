//! Flight Delay Predictor
//!
//! Trains, inspects and serves a gradient-boosted classifier that predicts
//! whether a flight will be delayed by more than 15 minutes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, StartupPolicy};
use delay_service::commands;
use tracing_subscriber::EnvFilter;

/// Flight Delay Predictor
#[derive(Parser)]
#[command(name = "flight-delay")]
#[command(about = "Delay prediction for scheduled flights")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Model artifact location (local path or gs://bucket/key), overrides `MODEL_PATH`
    #[arg(long, global = true)]
    model_path: Option<String>,

    /// Training data location (local path or gs://bucket/key), overrides `DATA_PATH`
    #[arg(long, global = true)]
    data_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on the training data and save it
    Train {
        /// Share of rows held out for the validation report
        #[arg(long)]
        validation_fraction: Option<f64>,
    },

    /// Predict delays for flights listed in a JSON file
    Predict {
        /// JSON file: {"flights": [{"OPERA": ..., "TIPOVUELO": ..., "MES": ...}]}
        #[arg(short, long)]
        input: PathBuf,

        /// What to do when no artifact exists, overrides `STARTUP_POLICY`
        #[arg(long)]
        startup_policy: Option<StartupPolicy>,
    },

    /// Print the metadata and feature schema of a saved model
    Inspect,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(model_path) = cli.model_path {
        config.model_path = model_path;
    }
    if let Some(data_path) = cli.data_path {
        config.data_path = data_path;
    }

    // Initialize tracing subscriber
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&config.log_level)
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Train {
            validation_fraction,
        } => {
            commands::train::run(&config, validation_fraction).await?;
        }
        Commands::Predict {
            input,
            startup_policy,
        } => {
            if let Some(policy) = startup_policy {
                config.startup_policy = policy;
            }
            commands::predict::run(&config, &input).await?;
        }
        Commands::Inspect => {
            commands::inspect::run(&config).await?;
        }
    }

    Ok(())
}
