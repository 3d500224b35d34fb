//! # V4L2 camera producer
//!
//! Captures MJPEG frames from the vehicle camera with `rscam` and publishes them into the camera
//! slot.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Utc;
use log::{error, info, warn};
use rscam::{Camera, Config};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};
use std::thread::{self, JoinHandle};

use super::SensorSlot;
use comms_if::eqpt::cam::{CamFrame, CamImage, ImageFormat};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CamParams {
    /// Path to the V4L2 device
    pub device: String,

    /// Frame interval as (numerator, denominator)
    ///
    /// Units: seconds
    pub interval: (u32, u32),

    /// Capture resolution as (width, height)
    ///
    /// Units: pixels
    pub resolution: (u32, u32),
}

/// A running camera capture thread.
pub struct CamStream {
    handle: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CamStreamError {
    #[error("Could not open the camera {0}: {1}")]
    OpenError(String, std::io::Error),

    #[error("Could not start the camera: {0}")]
    StartError(rscam::Error),

    #[error("The capture thread exited before the camera started")]
    ThreadExited,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CamParams {
    fn default() -> Self {
        Self {
            device: String::from("/dev/videoCAM"),
            interval: (1, 30),
            resolution: (640, 480),
        }
    }
}

impl CamStream {
    /// Open the camera and start capturing in a background thread.
    ///
    /// Returns once the camera has started, or with the error that stopped it starting.
    pub fn start(
        params: &CamParams,
        cam_slot: SensorSlot<CamImage>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, CamStreamError> {
        let (tx, rx) = mpsc::sync_channel(1);
        let device = params.device.clone();
        let params = params.clone();

        // The camera is opened on the capture thread and only the start result comes back
        let handle = thread::spawn(move || {
            let camera = match open(&params) {
                Ok(c) => {
                    tx.send(Ok(())).ok();
                    c
                }
                Err(e) => {
                    tx.send(Err(e)).ok();
                    return;
                }
            };

            capture_loop(camera, &cam_slot, &shutdown);
        });

        match rx.recv() {
            Ok(Ok(())) => {
                info!("Camera {} started", device);
                Ok(Self {
                    handle: Some(handle),
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CamStreamError::ThreadExited),
        }
    }

    /// Wait for the capture thread to finish.
    pub fn join(mut self) {
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                warn!("Camera thread panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn open(params: &CamParams) -> Result<Camera, CamStreamError> {
    let mut camera = Camera::new(&params.device)
        .map_err(|e| CamStreamError::OpenError(params.device.clone(), e))?;

    camera
        .start(&Config {
            interval: params.interval,
            resolution: params.resolution,
            format: b"MJPG",
            ..Default::default()
        })
        .map_err(CamStreamError::StartError)?;

    Ok(camera)
}

fn capture_loop(camera: Camera, cam_slot: &SensorSlot<CamImage>, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Relaxed) {
        let raw = match camera.capture() {
            Ok(f) => f,
            Err(e) => {
                error!("Could not capture a camera frame: {}", e);
                break;
            }
        };

        let frame = CamFrame {
            timestamp: Utc::now(),
            format: ImageFormat::Jpeg(100),
            data: raw.to_vec(),
        };

        match frame.to_cam_image() {
            Ok(i) => {
                cam_slot.publish(i);
            }
            Err(e) => warn!("{}", e),
        }
    }
}
