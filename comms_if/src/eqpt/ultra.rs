//! # Ultrasonic Equipment Data

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of ultrasonic sensors in one sample.
pub const NUM_ULTRA: usize = 4;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One reading from all ultrasonic sensors.
///
/// The meaning of each index is fixed by the sensor wiring.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RangeSample {
    /// UTC timestamp at which the sample was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Distance reported by each sensor
    pub dists: [i32; NUM_ULTRA]
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RangeSample {
    /// Create a sample acquired now.
    pub fn new(dists: [i32; NUM_ULTRA]) -> Self {
        Self {
            timestamp: Utc::now(),
            dists
        }
    }

    /// Distance from the sensor at the given index, if it exists.
    pub fn dist(&self, index: usize) -> Option<i32> {
        self.dists.get(index).copied()
    }
}
