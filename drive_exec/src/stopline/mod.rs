//! Stopline detection module
//!
//! A stopline is a bright band across the lane in front of the vehicle. It is detected by
//! counting bright pixels in the lower centre region of the working frame.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use image::GenericImageView;
use log::trace;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};

pub use params::*;

use crate::cv_frame::{frame_to_hsv, CvFrameError};
use comms_if::eqpt::cam::{is_empty_frame, Frame};
use util::{module::State, params as util_params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StoplineDet {
    params: Params,
}

#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
pub struct StatusReport {
    /// Number of pixels in the region brighter than the threshold
    pub num_bright: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoplineError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util_params::LoadError),

    #[error("Could not convert the frame: {0}")]
    FrameError(CvFrameError),

    #[error("OpenCV error: {0}")]
    OpenCvError(opencv::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for StoplineDet {
    type InitData = &'static str;
    type InitError = StoplineError;

    type InputData = Frame;
    type OutputData = bool;
    type StatusReport = StatusReport;
    type ProcError = StoplineError;

    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = util_params::load(init_data).map_err(StoplineError::ParamLoadError)?;
        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let num_bright = self.count_bright(input_data)?;
        let is_stopline = num_bright > self.params.count_thresh;

        trace!("Stopline: {} bright pixels, detected = {}", num_bright, is_stopline);

        Ok((is_stopline, StatusReport { num_bright }))
    }
}

impl StoplineDet {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Count the pixels in the lower centre region whose value is above the threshold.
    fn count_bright(&self, frame: &Frame) -> Result<usize, StoplineError> {
        if is_empty_frame(frame) {
            return Ok(0);
        }

        let (w, h) = frame.dimensions();

        // Rows [h/2, h), columns [w/3, 2w/3)
        let x0 = w / 3;
        let y0 = h / 2;
        let roi = frame.view(x0, y0, 2 * w / 3 - x0, h - y0).to_image();

        if is_empty_frame(&roi) {
            return Ok(0);
        }

        let hsv = frame_to_hsv(&roi).map_err(StoplineError::FrameError)?;

        let mut value = Mat::default();
        core::extract_channel(&hsv, &mut value, 2).map_err(StoplineError::OpenCvError)?;

        let mut bright = Mat::default();
        imgproc::threshold(
            &value,
            &mut bright,
            self.params.brightness_thresh as f64,
            255.0,
            imgproc::THRESH_BINARY,
        )
        .map_err(StoplineError::OpenCvError)?;

        let count = core::count_non_zero(&bright).map_err(StoplineError::OpenCvError)?;

        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
