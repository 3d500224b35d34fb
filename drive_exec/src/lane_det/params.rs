//! Parameters structure for LaneDet

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use opencv::core::Scalar;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for lane detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Yellow (centre line) colour band
    pub yellow: ColourBand,

    /// White (edge line) colour band
    pub white: ColourBand,

    /// Segments with a slope below this value are left lane candidates.
    pub left_slope_max: f64,

    /// Segments with a slope above this value are right lane candidates.
    pub right_slope_min: f64,
}

/// Segmentation and line extraction settings for one lane marking colour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColourBand {
    /// Inclusive lower HSV bound. Hue is in the range [0, 180).
    pub hsv_lower: [u8; 3],

    /// Inclusive upper HSV bound.
    pub hsv_upper: [u8; 3],

    /// Lower hysteresis threshold of the edge detector
    pub canny_low: f64,

    /// Upper hysteresis threshold of the edge detector
    pub canny_high: f64,

    pub hough: HoughParams,
}

/// Probabilistic Hough transform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoughParams {
    /// Distance resolution of the accumulator.
    ///
    /// Units: pixels
    pub rho: f64,

    /// Number of angle bins over [0, pi). The angle resolution is `pi / num_angles`.
    pub num_angles: u32,

    /// Minimum number of accumulator votes for a line.
    pub threshold: u32,

    /// Minimum length of a segment.
    ///
    /// Units: pixels
    pub min_line_length: i32,

    /// Maximum gap between points on the same segment.
    ///
    /// Units: pixels
    pub max_line_gap: i32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            // Thin or dashed yellow centre lines, finer angle and fewer votes
            yellow: ColourBand {
                hsv_lower: [20, 100, 100],
                hsv_upper: [30, 255, 255],
                canny_low: 50.0,
                canny_high: 150.0,
                hough: HoughParams {
                    rho: 1.0,
                    num_angles: 170,
                    threshold: 20,
                    min_line_length: 15,
                    max_line_gap: 8,
                },
            },
            // Solid white edge lines
            white: ColourBand {
                hsv_lower: [0, 0, 190],
                hsv_upper: [200, 255, 255],
                canny_low: 30.0,
                canny_high: 150.0,
                hough: HoughParams {
                    rho: 1.0,
                    num_angles: 180,
                    threshold: 40,
                    min_line_length: 20,
                    max_line_gap: 10,
                },
            },
            left_slope_max: -0.5,
            right_slope_min: 0.5,
        }
    }
}

impl ColourBand {
    /// The lower HSV bound as an OpenCV scalar.
    pub fn lower(&self) -> Scalar {
        to_scalar(self.hsv_lower)
    }

    /// The upper HSV bound as an OpenCV scalar.
    pub fn upper(&self) -> Scalar {
        to_scalar(self.hsv_upper)
    }
}

impl Params {
    /// Check the parameters are usable, returning a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        for (name, band) in [("yellow", &self.yellow), ("white", &self.white)].iter() {
            if band.hough.rho <= 0.0 {
                return Err(format!("{} hough rho must be positive", name));
            }
            if band.hough.num_angles == 0 {
                return Err(format!("{} hough num_angles must be non-zero", name));
            }
            if band.hough.threshold == 0 || band.hough.threshold > i32::MAX as u32 {
                return Err(format!("{} hough threshold out of range", name));
            }
        }

        if self.left_slope_max > self.right_slope_min {
            return Err(String::from("left_slope_max must not exceed right_slope_min"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn to_scalar(hsv: [u8; 3]) -> Scalar {
    Scalar::new(hsv[0] as f64, hsv[1] as f64, hsv[2] as f64, 0.0)
}
