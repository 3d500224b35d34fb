//! # Communications interface crate.
//!
//! Provides the interface types exchanged between the sensor producers, the control core and the
//! actuator sinks.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data and command definitions for equipment (camera, ultrasonics, motor)
pub mod eqpt;
