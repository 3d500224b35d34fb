//! # Drive library.
//!
//! This library allows the executables and benchmarks in the drive crate to access the control
//! modules.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Conversion between frames and OpenCV matrices
pub mod cv_frame;

/// Data store - module states and the data produced on each cycle
pub mod data_store;

/// Drive manager - the control loop
pub mod drive_mgr;

/// Frame preprocessing - rotates raw camera frames into the working frame
pub mod frame_prep;

/// Lane detection - finds the left and right lane lines in the working frame
pub mod lane_det;

/// Executable parameters
pub mod params;

/// Sensor and actuator interfaces, and the data sources which feed them
pub mod sensor_if;

/// Steering control - fuses lane and wall estimates into motor commands
pub mod steer_ctrl;

/// Stopline detection - looks for a bright band in front of the vehicle
pub mod stopline;

/// Wall proximity - steers away from the closer wall
pub mod wall_prox;
