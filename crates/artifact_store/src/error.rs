//! Storage failures and their classification.

use std::io;
use std::time::Duration;

use delay_model::ArtifactError;
use thiserror::Error;

use crate::BUCKET_SCHEME;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse category of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum StoreErrorKind {
    InvalidLocation,
    NotFound,
    PermissionDenied,
    Transient,
    Corrupt,
    Backend,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid location {location:?}: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("no artifact at {location}")]
    NotFound { location: String },

    #[error("permission denied for {location}: {source}")]
    PermissionDenied {
        location: String,
        #[source]
        source: BoxError,
    },

    #[error("transient storage failure for {location}: {source}")]
    Transient {
        location: String,
        #[source]
        source: BoxError,
    },

    #[error("{operation} on {location} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        location: String,
        after: Duration,
    },

    #[error("artifact at {location} is unreadable: {source}")]
    Corrupt {
        location: String,
        #[source]
        source: ArtifactError,
    },

    #[error("storage backend failure for {location}: {source}")]
    Backend {
        location: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    #[must_use]
    pub const fn kind(&self) -> StoreErrorKind {
        match self {
            Self::InvalidLocation { .. } => StoreErrorKind::InvalidLocation,
            Self::NotFound { .. } => StoreErrorKind::NotFound,
            Self::PermissionDenied { .. } => StoreErrorKind::PermissionDenied,
            Self::Transient { .. } | Self::Timeout { .. } => StoreErrorKind::Transient,
            Self::Corrupt { .. } => StoreErrorKind::Corrupt,
            Self::Backend { .. } => StoreErrorKind::Backend,
        }
    }

    /// Only transient failures are worth another attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.kind(), StoreErrorKind::Transient)
    }

    pub(crate) fn from_io(location: &impl ToString, err: io::Error) -> Self {
        let location = location.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { location },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                location,
                source: Box::new(err),
            },
            io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ResourceBusy => Self::Transient {
                location,
                source: Box::new(err),
            },
            _ => Self::Backend {
                location,
                source: Box::new(err),
            },
        }
    }

    /// A bucket client that cannot be built is misconfigured; retrying will
    /// not change that.
    pub(crate) fn from_client_build(bucket: &str, err: object_store::Error) -> Self {
        Self::Backend {
            location: format!("{BUCKET_SCHEME}{bucket}"),
            source: Box::new(err),
        }
    }

    pub(crate) fn from_object_store(location: &impl ToString, err: object_store::Error) -> Self {
        let location = location.to_string();
        match err {
            object_store::Error::NotFound { .. } => Self::NotFound { location },
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => Self::PermissionDenied {
                location,
                source: Box::new(err),
            },
            object_store::Error::Generic { .. } => {
                // Generic covers exhausted HTTP retries as well as auth
                // failures surfaced as plain messages.
                if looks_like_access_failure(&err.to_string()) {
                    Self::PermissionDenied {
                        location,
                        source: Box::new(err),
                    }
                } else {
                    Self::Transient {
                        location,
                        source: Box::new(err),
                    }
                }
            }
            _ => Self::Backend {
                location,
                source: Box::new(err),
            },
        }
    }
}

fn looks_like_access_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["403", "401", "permission", "forbidden", "access denied", "credential"]
        .iter()
        .any(|needle| message.contains(needle))
}
