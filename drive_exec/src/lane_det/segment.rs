//! Line segments and their classification into lane candidates

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use opencv::{
    core::{Mat, Point, Scalar},
    imgproc,
};
use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Colour used to draw classified segments onto overlays, green in either channel order.
pub const OVERLAY_COLOUR: [f64; 3] = [0.0, 255.0, 0.0];

/// Width of segments drawn onto overlays.
///
/// Units: pixels
pub const OVERLAY_THICKNESS: i32 = 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A line segment in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Segments sorted by which lane line they could belong to.
#[derive(Debug, Clone, Default)]
pub struct LaneCandidateSet {
    pub left: Vec<LineSegment>,
    pub right: Vec<LineSegment>,

    /// Number of vertical segments that were skipped.
    pub num_degenerate: usize,

    /// Number of segments too shallow to be either lane.
    pub num_discarded: usize,
}

/// Estimated horizontal position of both lane lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaneEstimate {
    /// True if both lane lines were found. If false both positions are zero.
    pub found: bool,

    /// Midpoint x position of the left lane line.
    ///
    /// Units: pixels
    pub x_left: i32,

    /// Midpoint x position of the right lane line.
    ///
    /// Units: pixels
    pub x_right: i32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Slope of the segment in frame coordinates, or `None` for a vertical segment.
    pub fn slope(&self) -> Option<f64> {
        if self.x1 == self.x2 {
            return None;
        }

        Some((self.y2 - self.y1) as f64 / (self.x2 - self.x1) as f64)
    }
}

impl LaneCandidateSet {
    /// Sort segments into left and right candidates.
    ///
    /// Segments with a slope strictly below `left_slope_max` are left candidates, those strictly
    /// above `right_slope_min` are right candidates. Anything in between, including the
    /// thresholds themselves, is discarded.
    pub fn classify<I>(segments: I, left_slope_max: f64, right_slope_min: f64) -> Self
    where
        I: IntoIterator<Item = LineSegment>,
    {
        let mut set = Self::default();

        for seg in segments {
            match seg.slope() {
                Some(m) if m < left_slope_max => set.left.push(seg),
                Some(m) if m > right_slope_min => set.right.push(seg),
                Some(_) => set.num_discarded += 1,
                None => set.num_degenerate += 1,
            }
        }

        set
    }

    /// Reduce each side to a single segment and take its midpoint.
    pub fn estimate(&self) -> LaneEstimate {
        match (average(&self.left), average(&self.right)) {
            (Some(l), Some(r)) => LaneEstimate {
                found: true,
                x_left: mid_x(&l),
                x_right: mid_x(&r),
            },
            _ => LaneEstimate::not_found(),
        }
    }

    /// Iterate over all classified segments.
    pub fn iter(&self) -> impl Iterator<Item = &LineSegment> {
        self.left.iter().chain(self.right.iter())
    }
}

impl LaneEstimate {
    pub fn not_found() -> Self {
        Self {
            found: false,
            x_left: 0,
            x_right: 0,
        }
    }
}

impl Default for LaneEstimate {
    fn default() -> Self {
        Self::not_found()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Average each endpoint coordinate over a set of segments.
fn average(segs: &[LineSegment]) -> Option<[f64; 4]> {
    if segs.is_empty() {
        return None;
    }

    let mut sum = [0f64; 4];
    for s in segs {
        sum[0] += s.x1 as f64;
        sum[1] += s.y1 as f64;
        sum[2] += s.x2 as f64;
        sum[3] += s.y2 as f64;
    }

    let n = segs.len() as f64;
    Some([sum[0] / n, sum[1] / n, sum[2] / n, sum[3] / n])
}

fn mid_x(seg: &[f64; 4]) -> i32 {
    ((seg[0] + seg[2]) / 2.0).trunc() as i32
}

/// Draw segments onto an 8 bit, 3 channel matrix, clipped to its bounds.
pub fn draw_segments<'a, I>(mat: &mut Mat, segs: I) -> opencv::Result<()>
where
    I: IntoIterator<Item = &'a LineSegment>,
{
    let colour = Scalar::new(OVERLAY_COLOUR[0], OVERLAY_COLOUR[1], OVERLAY_COLOUR[2], 0.0);

    for s in segs {
        imgproc::line(
            mat,
            Point::new(s.x1, s.y1),
            Point::new(s.x2, s.y2),
            colour,
            OVERLAY_THICKNESS,
            imgproc::LINE_8,
            0,
        )?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn classify(segs: Vec<LineSegment>) -> LaneCandidateSet {
        LaneCandidateSet::classify(segs, -0.5, 0.5)
    }

    #[test]
    fn test_slope() {
        assert_eq!(LineSegment::new(0, 0, 10, 5).slope(), Some(0.5));
        assert_eq!(LineSegment::new(0, 10, 10, 0).slope(), Some(-1.0));
        assert_eq!(LineSegment::new(4, 0, 4, 50).slope(), None);
    }

    #[test]
    fn test_classify_boundaries() {
        let set = classify(vec![
            // Exactly -0.5 and 0.5
            LineSegment::new(0, 50, 100, 0),
            LineSegment::new(0, 0, 100, 50),
            // Just beyond
            LineSegment::new(0, 51, 100, 0),
            LineSegment::new(0, 0, 100, 51),
        ]);

        assert_eq!(set.left, vec![LineSegment::new(0, 51, 100, 0)]);
        assert_eq!(set.right, vec![LineSegment::new(0, 0, 100, 51)]);
        assert_eq!(set.num_discarded, 2);
        assert_eq!(set.num_degenerate, 0);
    }

    #[test]
    fn test_vertical_excluded() {
        let set = classify(vec![
            LineSegment::new(10, 0, 10, 100),
            LineSegment::new(0, 100, 50, 0),
        ]);

        assert_eq!(set.left.len(), 1);
        assert!(set.right.is_empty());
        assert_eq!(set.num_degenerate, 1);

        // Only one side, so nothing found
        assert_eq!(set.estimate(), LaneEstimate::not_found());
    }

    #[test]
    fn test_estimate_averages() {
        let set = classify(vec![
            LineSegment::new(90, 400, 110, 380),
            LineSegment::new(95, 410, 106, 390),
            LineSegment::new(290, 380, 310, 400),
        ]);

        // Left averaged segment is (92.5, 405, 108, 385), midpoint 100.25
        assert_eq!(
            set.estimate(),
            LaneEstimate {
                found: true,
                x_left: 100,
                x_right: 300
            }
        );
    }

    #[test]
    fn test_empty() {
        let set = classify(Vec::new());
        assert_eq!(set.estimate(), LaneEstimate::not_found());
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn test_draw_segments() {
        use crate::cv_frame::{frame_to_mat, mat_to_frame};
        use comms_if::eqpt::cam::Frame;
        use image::Rgb;

        let green = Rgb([0, 255, 0]);

        let mut mat = frame_to_mat(&Frame::new(20, 20)).unwrap();
        let segs = [LineSegment::new(0, 0, 10, 10), LineSegment::new(15, 5, 25, 5)];
        draw_segments(&mut mat, segs.iter()).unwrap();

        let frame = mat_to_frame(&mat).unwrap();
        assert_eq!(*frame.get_pixel(5, 5), green);
        assert_eq!(*frame.get_pixel(19, 5), green);
        assert_eq!(*frame.get_pixel(0, 19), Rgb([0, 0, 0]));
    }
}
