//! Feature encoder crate for the flight delay model.
//!
//! This crate turns raw flight records into fixed-width one-hot feature
//! vectors and owns the feature schema those vectors are indexed by.
//!
//! Column names follow the source data: `OPERA_<carrier>`,
//! `TIPOVUELO_<type>` and `MES_<month>`. Carrier and flight type each get an
//! extra `_nan` column that is set when the value is missing.

use std::collections::{BTreeSet, HashMap};

use flight_structs::RawRecord;
use tracing::debug;

mod schema;

pub use schema::{FeatureSchema, SchemaError};

/// Number of columns every trained model consumes.
pub const FEATURE_COUNT: usize = 10;

/// The fixed feature selection, in model input order.
///
/// Chosen ahead of time from feature importance on the historical data set;
/// this list is not learned per training run.
pub const SELECTED_FEATURES: [&str; FEATURE_COUNT] = [
    "OPERA_Latin American Wings",
    "MES_7",
    "MES_10",
    "OPERA_Grupo LATAM",
    "MES_12",
    "TIPOVUELO_I",
    "MES_4",
    "MES_11",
    "OPERA_Sky Airline",
    "OPERA_Copa Air",
];

pub const CARRIER_PREFIX: &str = "OPERA";
pub const FLIGHT_TYPE_PREFIX: &str = "TIPOVUELO";
pub const MONTH_PREFIX: &str = "MES";

/// Suffix of the column reserved for a missing value.
pub const MISSING_SUFFIX: &str = "nan";

/// Feature vector for a single record, indexed by a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    /// One value per schema column; 1.0 for the active category, 0.0 otherwise.
    pub values: Vec<f32>,
}

impl FeatureVector {
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// Output of [`encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    /// Schema the vectors are indexed by.
    pub schema: FeatureSchema,
    /// Every column this batch produced before reindexing, in derivation order.
    pub observed: FeatureSchema,
    /// One vector per input record, in input order.
    pub vectors: Vec<FeatureVector>,
}

/// Column name for a carrier value.
#[must_use]
pub fn carrier_column(carrier: &str) -> String {
    category_column(CARRIER_PREFIX, carrier)
}

/// Column name for a flight type value.
#[must_use]
pub fn flight_type_column(flight_type: &str) -> String {
    category_column(FLIGHT_TYPE_PREFIX, flight_type)
}

/// Column name for a month.
#[must_use]
pub fn month_column(month: u8) -> String {
    format!("{MONTH_PREFIX}_{month}")
}

fn category_column(prefix: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        format!("{prefix}_{MISSING_SUFFIX}")
    } else {
        format!("{prefix}_{value}")
    }
}

/// The three columns a record activates, before any reindexing.
fn active_columns(record: &RawRecord) -> [String; 3] {
    [
        carrier_column(&record.carrier),
        flight_type_column(&record.flight_type),
        month_column(record.month),
    ]
}

/// Derives the full one-hot column list produced by a batch.
///
/// Order: carriers sorted, `OPERA_nan`, flight types sorted, `TIPOVUELO_nan`,
/// months ascending. The missing-value columns are always present; months
/// have none since they are bounded upstream.
#[must_use]
pub fn derive_schema(records: &[RawRecord]) -> FeatureSchema {
    let mut carriers = BTreeSet::new();
    let mut flight_types = BTreeSet::new();
    let mut months = BTreeSet::new();

    for record in records {
        let carrier = record.carrier.trim();
        if !carrier.is_empty() {
            carriers.insert(carrier);
        }
        let flight_type = record.flight_type.trim();
        if !flight_type.is_empty() {
            flight_types.insert(flight_type);
        }
        months.insert(record.month);
    }

    let mut columns = Vec::with_capacity(carriers.len() + flight_types.len() + months.len() + 2);
    columns.extend(carriers.into_iter().map(carrier_column));
    columns.push(format!("{CARRIER_PREFIX}_{MISSING_SUFFIX}"));
    columns.extend(flight_types.into_iter().map(flight_type_column));
    columns.push(format!("{FLIGHT_TYPE_PREFIX}_{MISSING_SUFFIX}"));
    columns.extend(months.into_iter().map(month_column));

    // Values are de-duplicated per category and prefixes are disjoint.
    FeatureSchema::from_unique(columns)
}

/// Encodes records against a known schema.
///
/// Columns in the schema that the batch never produces stay zero; columns the
/// batch produces that the schema lacks are dropped. Output width is always
/// `schema.len()` and output order follows input order.
#[must_use]
pub fn encode_with(records: &[RawRecord], schema: &FeatureSchema) -> Vec<FeatureVector> {
    let index: HashMap<&str, usize> = schema
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| (column.as_str(), i))
        .collect();

    records
        .iter()
        .map(|record| {
            let mut vector = FeatureVector::zeros(schema.len());
            for column in active_columns(record) {
                if let Some(&i) = index.get(column.as_str())
                    && let Some(slot) = vector.values.get_mut(i)
                {
                    *slot = 1.0;
                }
            }
            vector
        })
        .collect()
}

/// Encodes a batch of records.
///
/// Without a schema (training), the batch's own columns are derived and the
/// vectors are reduced to the fixed selection, which becomes the schema.
/// With a schema (serving), the vectors are reindexed to it.
#[must_use]
pub fn encode(records: &[RawRecord], schema: Option<&FeatureSchema>) -> EncodedBatch {
    let observed = derive_schema(records);

    let schema = match schema {
        Some(schema) => schema.clone(),
        None => {
            let selected = FeatureSchema::selected();
            let absent: Vec<&str> = selected
                .columns()
                .iter()
                .map(String::as_str)
                .filter(|column| !observed.contains(column))
                .collect();
            if !absent.is_empty() && !records.is_empty() {
                debug!(?absent, "Selected columns not present in training batch");
            }
            selected
        }
    };

    let vectors = encode_with(records, &schema);

    EncodedBatch {
        schema,
        observed,
        vectors,
    }
}
