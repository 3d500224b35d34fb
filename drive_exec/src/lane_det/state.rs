//! Implementations for the LaneDet state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use opencv::{
    core::{self, Mat, Vec4i, Vector},
    imgproc,
    prelude::*,
};
use serde::Serialize;
use std::f64::consts::PI;

// Internal
use super::{
    draw_segments, ColourBand, LaneCandidateSet, LaneDetError, LaneEstimate, LineSegment, Params,
};
use crate::cv_frame::{frame_to_hsv, frame_to_mat, mat_to_frame};
use comms_if::eqpt::cam::{is_empty_frame, Frame};
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Lane detection module state
#[derive(Default)]
pub struct LaneDet {
    params: Params,

    /// Candidates found on the last cycle
    candidates: LaneCandidateSet,

    report: StatusReport,
}

/// Status report for LaneDet processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Number of segments found in the yellow mask
    pub num_yellow_segments: usize,

    /// Number of segments found in the white mask
    pub num_white_segments: usize,

    pub num_left: usize,
    pub num_right: usize,

    /// Number of vertical segments skipped during classification
    pub num_degenerate: usize,

    /// Number of segments with too shallow a slope
    pub num_discarded: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for LaneDet {
    type InitData = &'static str;
    type InitError = LaneDetError;

    type InputData = Frame;
    type OutputData = LaneEstimate;
    type StatusReport = StatusReport;
    type ProcError = LaneDetError;

    /// Initialise the LaneDet module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data).map_err(LaneDetError::ParamLoadError)?;
        params.validate().map_err(LaneDetError::InvalidParams)?;

        *self = Self::new(params);

        Ok(())
    }

    /// Estimate the lane positions in the working frame.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.report = StatusReport::default();
        self.candidates = LaneCandidateSet::default();

        if is_empty_frame(input_data) {
            return Ok((LaneEstimate::not_found(), self.report));
        }

        let hsv = frame_to_hsv(input_data).map_err(LaneDetError::FrameError)?;
        let yellow =
            find_segments(&hsv, &self.params.yellow).map_err(LaneDetError::OpenCvError)?;
        let white = find_segments(&hsv, &self.params.white).map_err(LaneDetError::OpenCvError)?;

        self.report.num_yellow_segments = yellow.len();
        self.report.num_white_segments = white.len();

        self.candidates = LaneCandidateSet::classify(
            yellow.into_iter().chain(white),
            self.params.left_slope_max,
            self.params.right_slope_min,
        );

        self.report.num_left = self.candidates.left.len();
        self.report.num_right = self.candidates.right.len();
        self.report.num_degenerate = self.candidates.num_degenerate;
        self.report.num_discarded = self.candidates.num_discarded;

        let estimate = self.candidates.estimate();

        trace!("LaneDet: {:?}, {:?}", estimate, self.report);

        Ok((estimate, self.report))
    }
}

impl LaneDet {
    /// Create a new instance from a set of parameters.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// The candidates classified on the last cycle.
    pub fn candidates(&self) -> &LaneCandidateSet {
        &self.candidates
    }

    /// Draw the last cycle's candidates onto a copy of `frame`.
    pub fn overlay(&self, frame: &Frame) -> Result<Frame, LaneDetError> {
        if is_empty_frame(frame) {
            return Ok(frame.clone());
        }

        let mut mat = frame_to_mat(frame).map_err(LaneDetError::FrameError)?;
        draw_segments(&mut mat, self.candidates.iter()).map_err(LaneDetError::OpenCvError)?;

        mat_to_frame(&mat).map_err(LaneDetError::FrameError)
    }
}

/// Run segmentation, edge detection and line extraction for a single colour band.
fn find_segments(hsv: &Mat, band: &ColourBand) -> opencv::Result<Vec<LineSegment>> {
    let mut mask = Mat::default();
    core::in_range(hsv, &band.lower(), &band.upper(), &mut mask)?;

    let mut edges = Mat::default();
    imgproc::canny(&mask, &mut edges, band.canny_low, band.canny_high, 3, false)?;

    let mut lines = Vector::<Vec4i>::new();
    imgproc::hough_lines_p(
        &edges,
        &mut lines,
        band.hough.rho,
        PI / band.hough.num_angles as f64,
        band.hough.threshold as i32,
        band.hough.min_line_length as f64,
        band.hough.max_line_gap as f64,
    )?;

    Ok(lines
        .iter()
        .map(|l| LineSegment::new(l[0], l[1], l[2], l[3]))
        .collect())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;

    /// Build a frame with a yellow left lane line and a white right lane line.
    fn lane_frame() -> Frame {
        let mut frame = Frame::new(640, 480);

        for y in 290..=450i32 {
            for x in 0..640i32 {
                if (x + y - 470).abs() <= 3 {
                    frame.put_pixel(x as u32, y as u32, Rgb([255, 255, 0]));
                }
                if (x - y + 70).abs() <= 3 {
                    frame.put_pixel(x as u32, y as u32, Rgb([255, 255, 255]));
                }
            }
        }

        frame
    }

    #[test]
    fn test_empty_frame() {
        let mut lane_det = LaneDet::new(Params::default());
        let (estimate, report) = lane_det.proc(&Frame::new(0, 0)).unwrap();

        assert_eq!(estimate, LaneEstimate::not_found());
        assert_eq!(report.num_left + report.num_right, 0);
    }

    #[test]
    fn test_blank_frame() {
        let mut lane_det = LaneDet::new(Params::default());
        let (estimate, _) = lane_det.proc(&Frame::new(640, 480)).unwrap();

        assert!(!estimate.found);
        assert!(lane_det.candidates().iter().next().is_none());
    }

    #[test]
    fn test_lane_frame() {
        let frame = lane_frame();
        let mut lane_det = LaneDet::new(Params::default());
        let (estimate, report) = lane_det.proc(&frame).unwrap();

        assert!(estimate.found);
        assert!(report.num_yellow_segments > 0);
        assert!(report.num_left > 0 && report.num_right > 0);

        // Left line spans x in [20, 180], right line spans x in [220, 380]
        assert!(estimate.x_left >= 10 && estimate.x_left <= 190, "{:?}", estimate);
        assert!(estimate.x_right >= 210 && estimate.x_right <= 390, "{:?}", estimate);

        // Same frame, same result
        let (again, _) = lane_det.proc(&frame).unwrap();
        assert_eq!(estimate, again);
    }

    #[test]
    fn test_overlay_is_a_copy() {
        let frame = lane_frame();
        let mut lane_det = LaneDet::new(Params::default());
        lane_det.proc(&frame).unwrap();

        let overlay = lane_det.overlay(&frame).unwrap();
        assert_eq!(overlay.dimensions(), frame.dimensions());
        assert_ne!(overlay, frame);
        assert_eq!(lane_frame(), frame);

        // Every changed pixel is overlay green
        for (a, b) in overlay.pixels().zip(frame.pixels()) {
            if a != b {
                assert_eq!(*a, Rgb([0, 255, 0]));
            }
        }
    }

    #[test]
    fn test_segments_follow_lines() {
        let frame = lane_frame();
        let mut lane_det = LaneDet::new(Params::default());
        lane_det.proc(&frame).unwrap();

        // Left candidates lie along x + y = 470, right candidates along x - y = -70
        for s in lane_det.candidates().left.iter() {
            assert!((s.x1 + s.y1 - 470).abs() <= 6, "{:?}", s);
            assert!((s.x2 + s.y2 - 470).abs() <= 6, "{:?}", s);
        }
        for s in lane_det.candidates().right.iter() {
            assert!((s.x1 - s.y1 + 70).abs() <= 6, "{:?}", s);
            assert!((s.x2 - s.y2 + 70).abs() <= 6, "{:?}", s);
        }
    }
}
