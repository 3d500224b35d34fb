//! # Data Store

use chrono::Utc;
use comms_if::eqpt::{motor::SteeringCommand, ultra::RangeSample};
use serde::Serialize;
use util::time::duration_to_seconds;

use crate::{
    frame_prep::FramePrep,
    lane_det::{self, LaneDet, LaneEstimate},
    steer_ctrl::{self, SteerCtrl},
    stopline::{self, StoplineDet},
    wall_prox::WallProx,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Data store for the control loop.
///
/// Holds the processing modules and everything produced by them on the current cycle.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Sequence number of the camera sample held in the working frame
    pub frame_seq: u64,

    /// True if a new camera sample was prepared this cycle
    pub new_frame: bool,

    // Modules
    pub frame_prep: FramePrep,
    pub lane_det: LaneDet,
    pub stopline: StoplineDet,
    pub wall_prox: WallProx,
    pub steer_ctrl: SteerCtrl,

    // Cycle data
    pub range_sample: Option<RangeSample>,

    pub wall_cmd: Option<SteeringCommand>,

    pub lane_estimate: LaneEstimate,
    pub lane_det_report: lane_det::StatusReport,

    pub is_stopline: bool,
    pub stopline_report: stopline::StatusReport,

    pub steer_ctrl_output: Option<steer_ctrl::OutputData>,
    pub steer_ctrl_report: steer_ctrl::StatusReport,

    /// Telemetry for the last completed cycle
    pub last_record: Option<CycleRecord>,
}

/// Flat summary of one control cycle, archived to `drive/cycles.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleRecord {
    pub cycle: u64,
    pub time_s: f64,
    pub new_frame: bool,

    /// Time between acquiring the working frame and building this record, if there is a frame.
    ///
    /// Units: seconds
    pub frame_age_s: Option<f64>,

    pub lane_found: bool,
    pub x_left: i32,
    pub x_right: i32,
    pub num_left: usize,
    pub num_right: usize,
    pub stopline: bool,
    pub wall_angle: Option<f64>,
    pub correction_before: f64,
    pub correction_after: f64,
    pub angle: f64,
    pub speed: f64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears the outputs of the previous cycle. The stopline flag is kept until it is next
    /// evaluated.
    pub fn cycle_start(&mut self) {
        self.new_frame = false;
        self.wall_cmd = None;
        self.lane_estimate = LaneEstimate::not_found();
        self.lane_det_report = lane_det::StatusReport::default();
        self.steer_ctrl_output = None;
        self.steer_ctrl_report = steer_ctrl::StatusReport::default();
    }

    /// Build the telemetry record of the current cycle.
    pub fn cycle_record(&self, cmd: &SteeringCommand) -> CycleRecord {
        CycleRecord {
            cycle: self.num_cycles,
            time_s: util::session::get_elapsed_seconds(),
            new_frame: self.new_frame,
            frame_age_s: self
                .frame_prep
                .timestamp()
                .and_then(|t| duration_to_seconds(Utc::now() - t)),
            lane_found: self.lane_estimate.found,
            x_left: self.lane_estimate.x_left,
            x_right: self.lane_estimate.x_right,
            num_left: self.lane_det_report.num_left,
            num_right: self.lane_det_report.num_right,
            stopline: self.is_stopline,
            wall_angle: self.wall_cmd.map(|c| c.angle),
            correction_before: self.steer_ctrl_report.correction_before,
            correction_after: self.steer_ctrl_report.correction_after,
            angle: cmd.angle,
            speed: cmd.speed,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::cam::CamImage;
    use util::module::State;

    #[test]
    fn test_frame_age() {
        let mut ds = DataStore::default();
        let cmd = SteeringCommand::stop();

        // No frame yet
        assert_eq!(ds.cycle_record(&cmd).frame_age_s, None);

        let mut image = CamImage::empty();
        image.timestamp = Utc::now() - chrono::Duration::milliseconds(250);
        ds.frame_prep.proc(&image).unwrap();

        let age = ds.cycle_record(&cmd).frame_age_s.unwrap();
        assert!(age >= 0.25 && age < 5.0, "{}", age);
    }
}
