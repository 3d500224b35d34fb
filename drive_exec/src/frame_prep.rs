//! # Frame preprocessing
//!
//! The camera is mounted upside down, so each newly arrived raw frame is rotated by 180 degrees
//! into the working frame used by the estimators for the rest of the cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use image::imageops;
use std::convert::Infallible;

use comms_if::eqpt::cam::{CamImage, Frame};
use util::{module::State, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Owns the working frame between cycles.
pub struct FramePrep {
    frame: Frame,
    timestamp: Option<DateTime<Utc>>,
    num_frames: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StatusReport {
    /// Total number of frames prepared so far
    pub num_frames: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for FramePrep {
    type InitData = ();
    type InitError = Infallible;

    type InputData = CamImage;
    type OutputData = ();
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    fn init(&mut self, _init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        *self = Self::default();
        Ok(())
    }

    /// Replace the working frame with the rotated raw frame.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.frame = rotate(&input_data.image);
        self.timestamp = Some(input_data.timestamp);
        self.num_frames += 1;

        Ok(((), StatusReport { num_frames: self.num_frames }))
    }
}

impl Default for FramePrep {
    fn default() -> Self {
        Self {
            frame: Frame::new(0, 0),
            timestamp: None,
            num_frames: 0,
        }
    }
}

impl FramePrep {
    /// The current working frame. Zero sized until the first frame arrives.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Acquisition time of the current working frame.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

/// Rotate a frame by 180 degrees.
pub fn rotate(frame: &Frame) -> Frame {
    imageops::rotate180(frame)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
