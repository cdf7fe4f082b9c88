//! Ordered feature column names.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{FEATURE_COUNT, SELECTED_FEATURES};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate feature column: {0}")]
    DuplicateColumn(String),
}

/// The ordered list of encoded column names that defines a model's input contract.
///
/// Serialized as a plain array of names; duplicates are rejected on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Creates a schema from ordered column names.
    ///
    /// # Errors
    ///
    /// Returns an error if a column name appears twice.
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Creates a schema from columns already known to be distinct.
    pub(crate) const fn from_unique(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// The fixed selection every trained model is reduced to.
    #[must_use]
    pub fn selected() -> Self {
        Self {
            columns: SELECTED_FEATURES.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column, if present.
    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// True when this schema has the width of the fixed selection.
    #[must_use]
    pub fn has_selected_width(&self) -> bool {
        self.columns.len() == FEATURE_COUNT
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = SchemaError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}
