use serde::{Deserialize, Serialize};

use crate::{FlightType, is_known_carrier};

/// Months are 1-based.
pub const MONTHS: core::ops::RangeInclusive<u8> = 1..=12;

/// Reasons a record is rejected at the prediction boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("unknown carrier: {0}")]
    UnknownCarrier(String),

    #[error("unknown flight type: {0} (expected N or I)")]
    UnknownFlightType(String),

    #[error("month out of range: {0} (expected 1-12)")]
    MonthOutOfRange(u8),
}

/// A single flight as seen by the feature codec.
///
/// Field names follow the source data (`OPERA`, `TIPOVUELO`, `MES`) on the
/// wire, with the descriptive names accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct RawRecord {
    /// Operating carrier name.
    #[serde(rename = "OPERA", alias = "carrier")]
    pub carrier: String,

    /// `N` (national) or `I` (international).
    #[serde(rename = "TIPOVUELO", alias = "flight_type", alias = "type")]
    pub flight_type: String,

    /// Month of the flight, 1-12.
    #[serde(rename = "MES", alias = "month")]
    pub month: u8,
}

impl RawRecord {
    pub fn new(carrier: impl Into<String>, flight_type: impl Into<String>, month: u8) -> Self {
        Self {
            carrier: carrier.into(),
            flight_type: flight_type.into(),
            month,
        }
    }

    /// Checks the record against the allow-lists.
    ///
    /// # Errors
    ///
    /// Returns the first field that is not acceptable.
    pub fn validate(&self) -> Result<(), RecordError> {
        if !is_known_carrier(&self.carrier) {
            return Err(RecordError::UnknownCarrier(self.carrier.clone()));
        }
        self.flight_type.parse::<FlightType>()?;
        if !MONTHS.contains(&self.month) {
            return Err(RecordError::MonthOutOfRange(self.month));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record() {
        let record = RawRecord::new("Aerolineas Argentinas", "N", 3);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_invalid_fields() {
        assert_eq!(
            RawRecord::new("Aerolineas Falsas", "N", 3).validate(),
            Err(RecordError::UnknownCarrier("Aerolineas Falsas".to_string()))
        );
        assert_eq!(
            RawRecord::new("Iberia", "O", 3).validate(),
            Err(RecordError::UnknownFlightType("O".to_string()))
        );
        assert_eq!(
            RawRecord::new("Iberia", "I", 13).validate(),
            Err(RecordError::MonthOutOfRange(13))
        );
        assert_eq!(
            RawRecord::new("Iberia", "I", 0).validate(),
            Err(RecordError::MonthOutOfRange(0))
        );
    }

    #[test]
    fn test_deserialize_source_and_descriptive_names() {
        let source: RawRecord =
            serde_json::from_str(r#"{"OPERA":"Iberia","TIPOVUELO":"I","MES":7}"#)
                .expect("source names should parse");
        let descriptive: RawRecord =
            serde_json::from_str(r#"{"carrier":"Iberia","flight_type":"I","month":7}"#)
                .expect("descriptive names should parse");
        assert_eq!(source, descriptive);
        assert_eq!(source, RawRecord::new("Iberia", "I", 7));
    }
}
