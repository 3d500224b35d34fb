//! Sensor and actuator interfaces
//!
//! The control loop pulls camera frames and range samples from `SensorSlot`s filled by producer
//! threads, and pushes its commands out through a `MotorSink`. Camera exposure is set once during
//! initialisation through an `ExposureCtrl`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

#[cfg(feature = "cam")]
mod cam_stream;
mod log_motor;
mod replay;
mod slot;
mod v4l2;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

#[cfg(feature = "cam")]
pub use cam_stream::*;
pub use log_motor::*;
pub use replay::*;
pub use slot::*;
pub use v4l2::*;

use comms_if::eqpt::motor::SteeringCommand;
use util::archive::ArchiveError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest exposure value accepted by `ExposureCtrl::set_exposure`.
pub const MAX_EXPOSURE: i32 = 255;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Receives the commands produced by the control loop.
///
/// Each call carries one command which replaces any previous one.
pub trait MotorSink {
    fn emit(&mut self, cmd: &SteeringCommand) -> Result<(), MotorError>;
}

/// Sets the exposure of the camera.
pub trait ExposureCtrl {
    /// Set the exposure, which must be in the range `[0, MAX_EXPOSURE]`.
    fn set_exposure(&mut self, value: i32) -> Result<(), ExposureError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    #[error("Could not archive the motor demand: {0}")]
    ArchiveError(ArchiveError),
}

#[derive(Debug, thiserror::Error)]
pub enum ExposureError {
    #[error("Exposure value {0} is outside the range [0, {}]", MAX_EXPOSURE)]
    OutOfRange(i32),

    #[error("Could not run the exposure command: {0}")]
    CommandError(std::io::Error),

    #[error("The exposure command exited with {0}: {1}")]
    CommandFailed(std::process::ExitStatus, String),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Check an exposure value is within the accepted range.
pub fn check_exposure(value: i32) -> Result<(), ExposureError> {
    if (0..=MAX_EXPOSURE).contains(&value) {
        Ok(())
    } else {
        Err(ExposureError::OutOfRange(value))
    }
}
