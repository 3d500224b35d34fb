//! Lane detection module
//!
//! Estimates the position of the left and right lane lines in the working frame. The frame is
//! segmented into yellow and white masks, edges are extracted from each mask and line segments
//! are found with a probabilistic Hough transform. Segments are sorted into left and right
//! candidates by their slope and each side is reduced to a single representative segment.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod segment;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use segment::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LaneDet operation.
#[derive(Debug, thiserror::Error)]
pub enum LaneDetError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Could not convert the frame: {0}")]
    FrameError(crate::cv_frame::CvFrameError),

    #[error("OpenCV error: {0}")]
    OpenCvError(opencv::Error),
}
