//! Parameters structure for StoplineDet

use serde::{Deserialize, Serialize};

/// Parameters for stopline detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Pixels with a value strictly above this are bright.
    pub brightness_thresh: u8,

    /// A stopline is present when strictly more than this many pixels are bright.
    pub count_thresh: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            brightness_thresh: 200,
            count_thresh: 1000,
        }
    }
}
