//! # Motor Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demand sent to the motor driver.
///
/// This is the only externally visible output of a control cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct SteeringCommand {
    /// Steering angle demand. Negative values steer to the left, positive to the right.
    pub angle: f64,

    /// Drive speed demand.
    pub speed: f64
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SteeringCommand {
    pub fn new(angle: f64, speed: f64) -> Self {
        Self { angle, speed }
    }

    /// Zero angle, zero speed.
    pub fn stop() -> Self {
        Self::default()
    }
}
