//! Steering control module
//!
//! Fuses the lane estimate and the wall proximity command into the commands sent to the motor
//! driver each cycle. When the lane is lost the last correction term is held, so the vehicle
//! keeps steering the way it was last told to.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the wall and lane commands are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ArbitrationMode {
    /// Emit the wall command, if there is one, followed by the lane command. The lane command is
    /// last and so is the one that takes effect.
    Sequenced,

    /// Emit the lane command if the lane was found, otherwise the wall command. If there is no
    /// wall command either the held lane command is emitted.
    WallFallback,

    /// Ignore the wall command.
    LaneOnly,
}

impl Default for ArbitrationMode {
    fn default() -> Self {
        ArbitrationMode::Sequenced
    }
}
