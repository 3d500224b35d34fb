//! # Camera Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// A camera frame in memory.
///
/// A zero-sized frame is used to represent "no data yet".
pub type Frame = RgbImage;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An encoded frame as produced by the camera (or read from disk).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CamFrame {

    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The format of this frame
    pub format: ImageFormat,

    /// The formatted image data
    pub data: Vec<u8>
}

/// A decoded camera image.
#[derive(Debug, Clone)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: Frame
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible formats for encoded camera frames. This is used rather than image::ImageFormat to:
///     1. Restrict the formats that can be produced by the camera sources
///     2. Allow serialisation as image::ImageFormat does not implement serde.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub enum ImageFormat {
    /// PNG image
    Png,

    /// JPEG image with a quality value between 1 and 100, where 100 is best.
    Jpeg(u8)
}

/// A raw frame could not be decoded into an image.
#[derive(Debug, thiserror::Error)]
#[error("Could not decode {format:?} frame acquired at {timestamp}: {source}")]
pub struct SensorDecodeError {
    pub timestamp: DateTime<Utc>,
    pub format: ImageFormat,
    #[source]
    pub source: image::ImageError,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ImageFormat {
    /// Get the format matching a file extension, if it is supported.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg(100)),
            _ => None
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg(_) => image::ImageFormat::Jpeg
        }
    }
}

impl CamFrame {
    /// Decode this camera frame into a camera image
    pub fn to_cam_image(&self) -> Result<CamImage, SensorDecodeError> {
        let image = image::load_from_memory_with_format(
            &self.data,
            self.format.to_image_format()
        ).map_err(|source| SensorDecodeError {
            timestamp: self.timestamp,
            format: self.format,
            source
        })?;

        Ok(CamImage {
            timestamp: self.timestamp,
            image: image.to_rgb8()
        })
    }
}

impl CamImage {
    /// An image with no data, acquired now.
    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now(),
            image: Frame::new(0, 0)
        }
    }

    pub fn is_empty(&self) -> bool {
        is_empty_frame(&self.image)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Returns true if the frame has no pixels.
pub fn is_empty_frame(frame: &Frame) -> bool {
    frame.width() == 0 || frame.height() == 0
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_png() {
        let mut frame = Frame::new(4, 3);
        frame.put_pixel(1, 2, image::Rgb([255, 255, 0]));

        let mut data = Vec::new();
        image::DynamicImage::ImageRgb8(frame.clone())
            .write_to(&mut data, image::ImageOutputFormat::Png)
            .unwrap();

        let cam_frame = CamFrame {
            timestamp: Utc::now(),
            format: ImageFormat::Png,
            data
        };

        let cam_image = cam_frame.to_cam_image().unwrap();
        assert_eq!(cam_image.image, frame);
        assert!(!cam_image.is_empty());
    }

    #[test]
    fn test_decode_garbage() {
        let cam_frame = CamFrame {
            timestamp: Utc::now(),
            format: ImageFormat::Jpeg(90),
            data: vec![0, 1, 2, 3]
        };

        assert!(cam_frame.to_cam_image().is_err());
    }

    #[test]
    fn test_empty() {
        assert!(CamImage::empty().is_empty());
        assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg(100)));
        assert_eq!(ImageFormat::from_extension("bmp"), None);
    }
}
