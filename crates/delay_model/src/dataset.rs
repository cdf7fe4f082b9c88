//! Training data reader.
//!
//! Reads the historical flights CSV. Required columns are `OPERA`, `TIPOVUELO`
//! and `MES` (or `carrier`, `flight_type`, `month`). The delay comes from a
//! `delay_minutes` column when present, otherwise from the difference between
//! the operated (`Fecha-O`) and scheduled (`Fecha-I`) timestamps.

use chrono::NaiveDateTime;
use flight_structs::{RawRecord, TrainingExample};
use serde::Deserialize;
use tracing::info;

use crate::DatasetError;

/// Timestamp format of `Fecha-I` / `Fecha-O`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct FlightRow {
    #[serde(rename = "OPERA", alias = "carrier")]
    carrier: String,

    #[serde(rename = "TIPOVUELO", alias = "flight_type")]
    flight_type: String,

    #[serde(rename = "MES", alias = "month")]
    month: u8,

    #[serde(rename = "Fecha-I", default)]
    scheduled: Option<String>,

    #[serde(rename = "Fecha-O", default)]
    operated: Option<String>,

    #[serde(default, alias = "min_diff")]
    delay_minutes: Option<f64>,
}

/// Parses CSV bytes into training examples.
///
/// Row numbers in errors are 1-based and count the header line.
///
/// # Errors
///
/// Returns an error on malformed CSV, a row without any delay information,
/// an unparsable timestamp, or an input with no data rows.
pub fn read_examples(bytes: &[u8]) -> Result<Vec<TrainingExample>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let mut examples = Vec::new();
    for (index, result) in reader.deserialize::<FlightRow>().enumerate() {
        let row = index + 2;
        let flight = result.map_err(|source| DatasetError::Csv { row, source })?;
        let delay_minutes = resolve_delay(&flight, row)?;

        examples.push(TrainingExample::new(
            RawRecord::new(flight.carrier, flight.flight_type, flight.month),
            delay_minutes,
        ));
    }

    if examples.is_empty() {
        return Err(DatasetError::Empty);
    }

    info!(rows = examples.len(), "Read training data");
    Ok(examples)
}

fn resolve_delay(flight: &FlightRow, row: usize) -> Result<f64, DatasetError> {
    if let Some(delay) = flight.delay_minutes {
        return Ok(delay);
    }

    let (Some(scheduled), Some(operated)) = (&flight.scheduled, &flight.operated) else {
        return Err(DatasetError::MissingDelay { row });
    };

    let scheduled = parse_timestamp(scheduled, row)?;
    let operated = parse_timestamp(operated, row)?;

    #[expect(clippy::cast_precision_loss, reason = "delays are far below 2^52 seconds")]
    let minutes = (operated - scheduled).num_seconds() as f64 / 60.0;
    Ok(minutes)
}

fn parse_timestamp(value: &str, row: usize) -> Result<NaiveDateTime, DatasetError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|_| {
        DatasetError::InvalidTimestamp {
            row,
            value: value.to_string(),
        }
    })
}
