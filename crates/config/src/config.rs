use core::time::Duration;

use anyhow::Context;

/// Default location of the persisted model artifact.
pub const DEFAULT_MODEL_PATH: &str = "./models/delay_model.json";

/// Default location of the training data CSV.
pub const DEFAULT_DATA_PATH: &str = "./data/data.csv";

/// What the service does when no model artifact can be loaded at startup.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum StartupPolicy {
    /// Refuse to become ready; an operator must run training out-of-band.
    #[default]
    FailFast,
    /// Train from the configured data location and persist the result.
    TrainOnDemand,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the model artifact (local path or `gs://bucket/key`).
    pub model_path: String,

    /// Location of the training data CSV (local path or `gs://bucket/key`).
    pub data_path: String,

    /// Tracing filter directive, e.g. `info` or `delay_service=debug`.
    pub log_level: String,

    /// Behaviour when the artifact is missing at startup.
    pub startup_policy: StartupPolicy,

    /// Upper bound for a single storage call.
    pub storage_timeout: Duration,

    /// Retries for transient storage failures.
    pub storage_max_retries: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `MODEL_PATH`: artifact location (default: `./models/delay_model.json`)
    /// - `DATA_PATH`: training data location (default: `./data/data.csv`)
    /// - `LOG_LEVEL`: tracing filter (default: `info`)
    /// - `STARTUP_POLICY`: `fail-fast` or `train-on-demand` (default: `fail-fast`)
    /// - `STORAGE_TIMEOUT_SECS`: per-call storage timeout (default: `30`)
    /// - `STORAGE_MAX_RETRIES`: transient retries (default: `3`)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let model_path = lookup("MODEL_PATH").unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());
        let data_path = lookup("DATA_PATH").unwrap_or_else(|| DEFAULT_DATA_PATH.to_string());
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let startup_policy = lookup("STARTUP_POLICY")
            .map(|raw| raw.parse::<StartupPolicy>())
            .transpose()
            .context("STARTUP_POLICY must be `fail-fast` or `train-on-demand`")?
            .unwrap_or_default();

        let timeout_secs = lookup("STORAGE_TIMEOUT_SECS")
            .map(|raw| raw.parse::<u64>())
            .transpose()
            .context("STORAGE_TIMEOUT_SECS must be a whole number of seconds")?
            .unwrap_or(30);

        let storage_max_retries = lookup("STORAGE_MAX_RETRIES")
            .map(|raw| raw.parse::<usize>())
            .transpose()
            .context("STORAGE_MAX_RETRIES must be a non-negative integer")?
            .unwrap_or(3);

        Ok(Self {
            model_path,
            data_path,
            log_level,
            startup_policy,
            storage_timeout: Duration::from_secs(timeout_secs),
            storage_max_retries,
        })
    }
}
