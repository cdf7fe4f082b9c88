//! Flight delay prediction service.
//!
//! [`ModelService`] owns the model lifecycle and [`PredictionService`] is the
//! read-only boundary request handlers call into.

pub mod commands;
mod error;
mod lifecycle;
mod prediction;

pub use error::{ServiceError, ServiceErrorKind};
pub use lifecycle::{
    ModelService, ModelState, ModelStatus, ServiceSettings, store_policy,
};
pub use prediction::PredictionService;
