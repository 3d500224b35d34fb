//! Camera exposure control through `v4l2-ctl`

use log::{debug, info};
use std::process::Command;

use super::{check_exposure, ExposureCtrl, ExposureError};

/// Sets the absolute exposure of a V4L2 device by running `v4l2-ctl`.
pub struct V4l2Exposure {
    program: String,
    device: String,
}

/// Exposure control for sources without a camera, such as replays.
#[derive(Default)]
pub struct NoExposure;

impl V4l2Exposure {
    pub fn new(device: &str) -> Self {
        Self::with_program("v4l2-ctl", device)
    }

    /// Use an alternative program in place of `v4l2-ctl`.
    pub fn with_program(program: &str, device: &str) -> Self {
        Self {
            program: program.to_string(),
            device: device.to_string(),
        }
    }

    fn args(&self, value: i32) -> Vec<String> {
        vec![
            String::from("-d"),
            self.device.clone(),
            String::from("-c"),
            format!("exposure_absolute={}", value),
        ]
    }
}

impl ExposureCtrl for V4l2Exposure {
    fn set_exposure(&mut self, value: i32) -> Result<(), ExposureError> {
        check_exposure(value)?;

        let args = self.args(value);
        debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(ExposureError::CommandError)?;

        if !output.status.success() {
            return Err(ExposureError::CommandFailed(
                output.status,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        info!("Exposure of {} set to {}", self.device, value);

        Ok(())
    }
}

impl ExposureCtrl for NoExposure {
    fn set_exposure(&mut self, value: i32) -> Result<(), ExposureError> {
        check_exposure(value)?;
        debug!("No camera, ignoring exposure of {}", value);
        Ok(())
    }
}
