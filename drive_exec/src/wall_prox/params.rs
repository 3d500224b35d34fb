//! Parameters structure for WallProx

use serde::{Deserialize, Serialize};

/// Parameters for wall proximity steering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Index of the left facing sensor in the range sample
    pub left_index: usize,

    /// Index of the right facing sensor in the range sample
    pub right_index: usize,

    /// Magnitude of the steering angle applied when one side reads further than the other.
    pub steer_bias: f64,

    /// Speed demanded alongside the bias.
    pub speed: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            left_index: 1,
            right_index: 3,
            steer_bias: 50.0,
            speed: 12.0,
        }
    }
}
