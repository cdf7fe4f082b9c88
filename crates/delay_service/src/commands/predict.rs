//! Predict command - labels flights from a JSON file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use artifact_store::ArtifactStore;
use config::Config;
use flight_structs::RawRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ModelService, PredictionService, ServiceSettings, store_policy};

/// Accepts `{"flights": [...]}` or a bare array of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PredictRequest {
    Wrapped { flights: Vec<RawRecord> },
    Bare(Vec<RawRecord>),
}

impl PredictRequest {
    #[must_use]
    pub fn into_records(self) -> Vec<RawRecord> {
        match self {
            Self::Wrapped { flights } | Self::Bare(flights) => flights,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predict: Vec<u8>,
}

/// Runs the predict command.
///
/// # Arguments
///
/// * `config` - Resolved configuration; the startup policy decides whether a
///   missing artifact triggers training
/// * `input` - JSON file with the flights to label
///
/// # Errors
///
/// Returns an error if the input cannot be read, no model can be made
/// available, or a record is rejected.
pub async fn run(config: &Config, input: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let records = serde_json::from_str::<PredictRequest>(&raw)
        .context("Input must be {\"flights\": [...]} or an array of flights")?
        .into_records();

    info!(
        flights = records.len(),
        policy = %config.startup_policy,
        "Predicting delays"
    );

    let settings = ServiceSettings::from_config(config).context("Invalid model or data location")?;
    let store = Arc::new(ArtifactStore::new(store_policy(config)));
    let service = ModelService::new(store, settings);
    let predictions = PredictionService::new(&service);

    service
        .initialize()
        .await
        .context("No model is available")?;

    let labels = predictions.predict_delays(&records).map_err(|e| {
        anyhow::anyhow!("{} ({})", e.public_message(), e)
    })?;

    let response = PredictResponse { predict: labels };
    println!("{}", serde_json::to_string(&response)?);

    Ok(())
}
