//! Persisted model format.
//!
//! An artifact is a single JSON document:
//!
//! ```text
//! { "format": "flight-delay-model", "version": 1, "model": { "schema": [...], "classifier": {...}, "metadata": {...} } }
//! ```
//!
//! The schema travels with the classifier weights so a restored model always
//! encodes requests with the columns it was trained on.

use serde::{Deserialize, Serialize};

use crate::{ArtifactError, FittedModel};

pub const ARTIFACT_FORMAT: &str = "flight-delay-model";
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Serialize)]
struct Envelope<'a> {
    format: &'a str,
    version: u32,
    model: &'a FittedModel,
}

#[derive(Deserialize)]
struct Header {
    format: String,
    version: u32,
}

#[derive(Deserialize)]
struct OwnedEnvelope {
    model: FittedModel,
}

/// Serializes a model into artifact bytes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_bytes(model: &FittedModel) -> Result<Vec<u8>, ArtifactError> {
    let envelope = Envelope {
        format: ARTIFACT_FORMAT,
        version: ARTIFACT_VERSION,
        model,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Restores a model from artifact bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not an artifact of a supported version,
/// or if the schema and classifier disagree on the input width.
pub fn from_bytes(bytes: &[u8]) -> Result<FittedModel, ArtifactError> {
    let header: Header = serde_json::from_slice(bytes)?;
    if header.format != ARTIFACT_FORMAT {
        return Err(ArtifactError::UnsupportedFormat(header.format));
    }
    if header.version != ARTIFACT_VERSION {
        return Err(ArtifactError::UnsupportedVersion(header.version));
    }

    let OwnedEnvelope { model } = serde_json::from_slice(bytes)?;

    let schema = model.schema().len();
    let classifier = model.classifier().feature_count();
    if schema != classifier {
        return Err(ArtifactError::Inconsistent { schema, classifier });
    }

    Ok(model)
}
