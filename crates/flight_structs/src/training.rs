use serde::{Deserialize, Serialize};

use crate::RawRecord;

/// Flights more than this many minutes late are labelled as delayed.
pub const DELAY_THRESHOLD_MINUTES: f64 = 15.0;

/// A record paired with its observed delay.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrainingExample {
    pub record: RawRecord,
    /// Operated minus scheduled time, in minutes. Negative for early departures.
    pub delay_minutes: f64,
}

impl TrainingExample {
    #[must_use]
    pub const fn new(record: RawRecord, delay_minutes: f64) -> Self {
        Self {
            record,
            delay_minutes,
        }
    }

    /// Binary label: 1 when delayed beyond the threshold, else 0.
    #[must_use]
    pub fn label(&self) -> u8 {
        delay_label(self.delay_minutes)
    }
}

/// Derives the binary label from a delay in minutes.
#[must_use]
pub fn delay_label(delay_minutes: f64) -> u8 {
    u8::from(delay_minutes > DELAY_THRESHOLD_MINUTES)
}
