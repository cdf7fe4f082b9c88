//! Inspect command - prints an artifact's metadata and feature schema.

use anyhow::{Context, Result};
use artifact_store::{ArtifactStore, ModelLocation};
use config::Config;
use delay_model::{ClassificationReport, FittedModel, Hyperparameters};
use serde::Serialize;

use crate::store_policy;

/// What `inspect` prints.
#[derive(Debug, Serialize)]
pub struct ModelSummary<'a> {
    pub location: String,
    pub model_id: String,
    pub trained_at: String,
    pub hyperparameters: &'a Hyperparameters,
    pub scale_pos_weight: f32,
    pub training_rows: usize,
    pub validation_rows: usize,
    pub schema: &'a [String],
    pub observed_columns: usize,
    pub report: Option<&'a ClassificationReport>,
}

impl<'a> ModelSummary<'a> {
    #[must_use]
    pub fn new(location: &ModelLocation, model: &'a FittedModel) -> Self {
        let metadata = model.metadata();
        Self {
            location: location.to_string(),
            model_id: metadata.model_id.to_string(),
            trained_at: metadata.trained_at.to_rfc3339(),
            hyperparameters: &metadata.hyperparameters,
            scale_pos_weight: metadata.scale_pos_weight,
            training_rows: metadata.training_rows,
            validation_rows: metadata.validation_rows,
            schema: model.schema().columns(),
            observed_columns: metadata.observed_columns.len(),
            report: metadata.report.as_ref(),
        }
    }
}

/// Runs the inspect command.
///
/// # Errors
///
/// Returns an error if the artifact cannot be loaded.
pub async fn run(config: &Config) -> Result<()> {
    let location: ModelLocation = config
        .model_path
        .parse()
        .context("Invalid model location")?;

    let store = ArtifactStore::new(store_policy(config));
    let model = store
        .load(&location)
        .await
        .with_context(|| format!("Failed to load model from {location}"))?;

    let summary = ModelSummary::new(&location, &model);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
