//! Conversion between working frames and OpenCV matrices
//!
//! Frames keep the camera's RGB channel order when copied into a `Mat`, so colour conversions on
//! the matrix must use the `COLOR_RGB2*` codes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use opencv::{
    core::{AlgorithmHint, Mat, Scalar, CV_8UC3},
    imgproc,
    prelude::*,
};

use comms_if::eqpt::cam::{is_empty_frame, Frame};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CvFrameError {
    #[error("OpenCV error: {0}")]
    OpenCvError(#[from] opencv::Error),

    #[error("Expected an 8 bit, 3 channel matrix but found type {0}")]
    UnexpectedType(i32),

    #[error("Matrix data does not fill a {0}x{1} frame")]
    SizeMismatch(u32, u32),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Copy a frame into a new 8 bit, 3 channel matrix.
///
/// A zero sized frame gives an empty matrix.
pub fn frame_to_mat(frame: &Frame) -> Result<Mat, CvFrameError> {
    if is_empty_frame(frame) {
        return Ok(Mat::default());
    }

    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(frame.as_raw());

    Ok(mat)
}

/// Copy an 8 bit, 3 channel matrix back into a frame.
pub fn mat_to_frame(mat: &Mat) -> Result<Frame, CvFrameError> {
    if mat.empty() {
        return Ok(Frame::new(0, 0));
    }

    if mat.typ() != CV_8UC3 {
        return Err(CvFrameError::UnexpectedType(mat.typ()));
    }

    let (w, h) = (mat.cols() as u32, mat.rows() as u32);

    Frame::from_raw(w, h, mat.data_bytes()?.to_vec()).ok_or(CvFrameError::SizeMismatch(w, h))
}

/// Convert an RGB frame to 8 bit HSV, with hue in [0, 180).
pub fn frame_to_hsv(frame: &Frame) -> Result<Mat, CvFrameError> {
    let rgb = frame_to_mat(frame)?;
    let mut hsv = Mat::default();

    imgproc::cvt_color(
        &rgb,
        &mut hsv,
        imgproc::COLOR_RGB2HSV,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    Ok(hsv)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_frame_mat_frame() {
        let frame = Frame::from_fn(7, 3, |x, y| Rgb([x as u8, y as u8, 200]));

        let mat = frame_to_mat(&frame).unwrap();
        assert_eq!(mat.rows(), 3);
        assert_eq!(mat.cols(), 7);

        assert_eq!(mat_to_frame(&mat).unwrap(), frame);
    }

    #[test]
    fn test_empty_frame() {
        let mat = frame_to_mat(&Frame::new(0, 0)).unwrap();
        assert!(mat.empty());
        assert!(is_empty_frame(&mat_to_frame(&mat).unwrap()));
    }

    #[test]
    fn test_hsv_channel_order() {
        // Pure yellow in RGB order has a hue of 30 on the 8 bit scale, pure blue 120
        let frame = Frame::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([255, 255, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });

        let hsv = frame_to_hsv(&frame).unwrap();
        let yellow = hsv.at_2d::<opencv::core::Vec3b>(0, 0).unwrap();
        let blue = hsv.at_2d::<opencv::core::Vec3b>(0, 1).unwrap();

        assert_eq!(yellow[0], 30);
        assert_eq!(yellow[2], 255);
        assert_eq!(blue[0], 120);
    }

    #[test]
    fn test_wrong_type() {
        let grey = Mat::new_rows_cols_with_default(2, 2, opencv::core::CV_8UC1, Scalar::all(0.0))
            .unwrap();
        assert!(matches!(
            mat_to_frame(&grey),
            Err(CvFrameError::UnexpectedType(_))
        ));
    }
}
