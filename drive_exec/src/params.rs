//! # Drive Executable Parameters
//!
//! This module provides parameters for the drive executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Time to hold the stop command after the sensors come up.
    ///
    /// Units: seconds
    pub settle_delay_s: f64,

    /// Camera exposure applied once during initialisation, between 0 and 255.
    pub exposure: i32,

    /// V4L2 device whose exposure is set.
    pub exposure_device: String,

    /// Save an overlay image every this many cycles. Zero disables overlays.
    pub overlay_period_cycles: u64,

    /// Where sensor data comes from unless overridden on the command line.
    pub source: DataSource,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Source of camera frames and range samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// Stored frames and range samples, see `ReplayParams`.
    Replay,

    /// The vehicle camera. Range samples still come from the replay file.
    Cam,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DriveExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.1,
            settle_delay_s: 5.0,
            exposure: 100,
            exposure_device: String::from("/dev/videoCAM"),
            overlay_period_cycles: 0,
            source: DataSource::Replay,
        }
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replay" => Ok(DataSource::Replay),
            "cam" => Ok(DataSource::Cam),
            _ => Err(format!("Unknown data source \"{}\", expected replay or cam", s)),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file() {
        let params: DriveExecParams = util::params::from_str(
            r#"
            cycle_period_s = 0.1
            settle_delay_s = 5.0
            exposure = 100
            exposure_device = "/dev/videoCAM"
            overlay_period_cycles = 50
            source = "Cam"
            "#,
        )
        .unwrap();

        assert_eq!(params.overlay_period_cycles, 50);
        assert_eq!(params.source, DataSource::Cam);
    }

    #[test]
    fn test_source_from_str() {
        assert_eq!("Replay".parse::<DataSource>(), Ok(DataSource::Replay));
        assert_eq!("cam".parse::<DataSource>(), Ok(DataSource::Cam));
        assert!("usb".parse::<DataSource>().is_err());
    }
}
