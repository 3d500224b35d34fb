//! Parameters structure for SteerCtrl

use serde::{Deserialize, Serialize};

use super::ArbitrationMode;

/// Parameters for steering control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Speed demanded with every lane command.
    pub fix_speed: f64,

    /// Horizontal position the lane midpoint is steered towards. When not set half the frame
    /// width is used.
    ///
    /// Units: pixels
    #[serde(default)]
    pub view_centre: Option<i32>,

    #[serde(default)]
    pub arbitration: ArbitrationMode,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            fix_speed: 12.0,
            view_centre: None,
            arbitration: ArbitrationMode::Sequenced,
        }
    }
}
