//! Train command - fits a model on the configured data and persists it.

use std::sync::Arc;

use anyhow::{Context, Result};
use artifact_store::ArtifactStore;
use config::Config;
use tracing::info;

use crate::{ModelService, ServiceSettings, store_policy};

/// Runs the train command.
///
/// # Arguments
///
/// * `config` - Resolved configuration (paths already overridden by flags)
/// * `validation_fraction` - Held-out share of rows, default 0.33
///
/// # Errors
///
/// Returns an error if a location is malformed, or if training or
/// persisting fails.
pub async fn run(config: &Config, validation_fraction: Option<f64>) -> Result<()> {
    // Parse locations first so a malformed gs:// path fails before any work.
    let mut settings =
        ServiceSettings::from_config(config).context("Invalid model or data location")?;
    if let Some(fraction) = validation_fraction {
        settings.training.validation_fraction = fraction;
    }

    info!(
        data = %settings.data_location,
        model = %settings.model_location,
        validation_fraction = settings.training.validation_fraction,
        "Training delay model"
    );

    let store = Arc::new(ArtifactStore::new(store_policy(config)));
    let service = ModelService::new(store, settings);
    let model = service
        .train_and_persist()
        .await
        .context("Training failed")?;

    let metadata = model.metadata();
    info!(
        model_id = %metadata.model_id,
        training_rows = metadata.training_rows,
        validation_rows = metadata.validation_rows,
        scale_pos_weight = metadata.scale_pos_weight,
        "Model trained and saved"
    );

    if let Some(report) = &metadata.report {
        info!("=== Validation Report ===");
        info!("  Accuracy: {:.3}", report.accuracy);
        for (name, class) in [("on time", &report.on_time), ("delayed", &report.delayed)] {
            info!(
                "  {:<8} precision {:.3} | recall {:.3} | f1 {:.3} | support {}",
                name, class.precision, class.recall, class.f1, class.support
            );
        }
    }

    Ok(())
}
