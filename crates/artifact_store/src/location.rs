//! Artifact locations.

use core::fmt;
use core::str::FromStr;
use std::path::{Path, PathBuf};

use crate::StoreError;

/// Prefix selecting the bucket backend.
pub const BUCKET_SCHEME: &str = "gs://";

/// Optional explicit prefix for local paths.
pub const FILE_SCHEME: &str = "file://";

/// Which backend handles a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BackendKind {
    Local,
    Bucket,
}

/// Where an artifact lives. The backend is a pure function of the prefix.
///
/// - `gs://bucket/path/to/object` is a bucket location.
/// - Anything without a scheme (or with `file://`) is a local path.
/// - Any other `scheme://` is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelLocation {
    Local(PathBuf),
    Bucket { bucket: String, key: String },
}

impl ModelLocation {
    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        match self {
            Self::Local(_) => BackendKind::Local,
            Self::Bucket { .. } => BackendKind::Bucket,
        }
    }

    /// Local path, if this is a local location.
    #[must_use]
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Bucket { .. } => None,
        }
    }
}

impl FromStr for ModelLocation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| StoreError::InvalidLocation {
            location: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("location is empty"));
        }

        if let Some(rest) = trimmed.strip_prefix(BUCKET_SCHEME) {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(invalid("missing bucket name"));
            }
            if key.is_empty() {
                return Err(invalid("missing object key after bucket name"));
            }
            if key.ends_with('/') {
                return Err(invalid("object key names a directory"));
            }
            return Ok(Self::Bucket {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        if let Some(path) = trimmed.strip_prefix(FILE_SCHEME) {
            if path.is_empty() {
                return Err(invalid("missing file path"));
            }
            return Ok(Self::Local(PathBuf::from(path)));
        }

        if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(invalid(&format!("unsupported scheme {scheme:?}")));
        }

        Ok(Self::Local(PathBuf::from(trimmed)))
    }
}

impl fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Bucket { bucket, key } => write!(f, "{BUCKET_SCHEME}{bucket}/{key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreErrorKind;

    fn parse(s: &str) -> Result<ModelLocation, StoreError> {
        s.parse()
    }

    #[test]
    fn test_bucket_location() {
        let location = parse("gs://bucket1/models/m.bin").expect("should parse");
        assert_eq!(
            location,
            ModelLocation::Bucket {
                bucket: "bucket1".to_string(),
                key: "models/m.bin".to_string(),
            }
        );
        assert_eq!(location.backend(), BackendKind::Bucket);
        assert_eq!(location.to_string(), "gs://bucket1/models/m.bin");
    }

    #[test]
    fn test_local_location() {
        let location = parse("./models/m.bin").expect("should parse");
        assert_eq!(location, ModelLocation::Local(PathBuf::from("./models/m.bin")));
        assert_eq!(location.backend(), BackendKind::Local);

        let explicit = parse("file:///tmp/m.bin").expect("should parse");
        assert_eq!(explicit.local_path(), Some(Path::new("/tmp/m.bin")));
    }

    #[test]
    fn test_invalid_locations() {
        for raw in [
            "",
            "gs://",
            "gs://bucket1",
            "gs://bucket1/",
            "gs:///models/m.bin",
            "gs://bucket1/models/",
            "s3://bucket1/models/m.bin",
            "file://",
        ] {
            let err = parse(raw).expect_err(raw);
            assert_eq!(err.kind(), StoreErrorKind::InvalidLocation, "{raw}");
        }
    }
}
