use core::str::FromStr;

/// Flight type as coded in the source data (`TIPOVUELO`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum FlightType {
    #[strum(to_string = "N")]
    National,
    #[strum(to_string = "I")]
    International,
}

impl FlightType {
    /// Returns the single-letter code used in records.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::National => "N",
            Self::International => "I",
        }
    }
}

impl FromStr for FlightType {
    type Err = crate::RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N" => Ok(Self::National),
            "I" => Ok(Self::International),
            other => Err(crate::RecordError::UnknownFlightType(other.to_string())),
        }
    }
}
