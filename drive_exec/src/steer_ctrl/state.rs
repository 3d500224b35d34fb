//! Implementations for the SteerCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;
use std::convert::Infallible;

// Internal
use super::{ArbitrationMode, Params};
use crate::lane_det::LaneEstimate;
use comms_if::eqpt::motor::SteeringCommand;
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering control module state
#[derive(Default)]
pub struct SteerCtrl {
    params: Params,

    /// Angle correction carried over to the next lane command.
    correction: f64,
}

/// Input data to SteerCtrl.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    pub lane: LaneEstimate,

    /// The wall proximity command, if there was a range sample this cycle.
    pub wall: Option<SteeringCommand>,

    /// Width of the working frame.
    ///
    /// Units: pixels
    pub frame_width: u32,
}

/// Commands produced by one cycle of SteerCtrl.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputData {
    /// Every command to send to the motor driver, in order.
    pub emissions: Vec<SteeringCommand>,

    /// The command which takes effect, which is the last emission.
    pub command: SteeringCommand,
}

/// Status report for SteerCtrl processing.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    /// Correction before this cycle's lane command
    pub correction_before: f64,

    /// Correction after this cycle's lane command
    pub correction_after: f64,

    /// True if the wall command was emitted
    pub wall_emitted: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for SteerCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Initialise the SteerCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data)?;
        self.correction = 0.0;

        debug!("SteerCtrl arbitration mode: {:?}", self.params.arbitration);

        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let mut report = StatusReport {
            correction_before: self.correction,
            ..Default::default()
        };

        let lane_cmd = self.lane_command(&input_data.lane, input_data.frame_width);
        report.correction_after = self.correction;

        let mut emissions = Vec::with_capacity(2);

        match (self.params.arbitration, input_data.wall) {
            (ArbitrationMode::Sequenced, Some(wall)) => {
                emissions.push(wall);
                emissions.push(lane_cmd);
                report.wall_emitted = true;
            }
            (ArbitrationMode::WallFallback, Some(wall)) if !input_data.lane.found => {
                emissions.push(wall);
                report.wall_emitted = true;
            }
            _ => emissions.push(lane_cmd),
        }

        // There is always at least one emission
        let command = emissions[emissions.len() - 1];

        trace!("SteerCtrl: {:?} -> {:?}", emissions, report);

        Ok((OutputData { emissions, command }, report))
    }
}

impl SteerCtrl {
    /// Create a new instance from a set of parameters.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            correction: 0.0,
        }
    }

    /// The correction that will be applied to the next lane command.
    pub fn correction(&self) -> f64 {
        self.correction
    }

    /// Set the correction to be added to the next lane command.
    pub fn post_correction(&mut self, correction: f64) {
        self.correction = correction;
    }

    /// Calculate the lane command, consuming the correction if the lane was found.
    fn lane_command(&mut self, lane: &LaneEstimate, frame_width: u32) -> SteeringCommand {
        let angle = if lane.found {
            let view_centre = self
                .params
                .view_centre
                .unwrap_or(frame_width as i32 / 2);

            let midpoint = (lane.x_left + lane.x_right).div_euclid(2);
            let offset = midpoint - view_centre;

            let angle = offset as f64 / 2.0 + self.correction;
            self.correction = 0.0;
            angle
        } else {
            self.correction
        };

        SteeringCommand::new(angle, self.params.fix_speed)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const FOUND: LaneEstimate = LaneEstimate {
        found: true,
        x_left: 100,
        x_right: 300,
    };

    fn input(lane: LaneEstimate, wall: Option<SteeringCommand>) -> InputData {
        InputData {
            lane,
            wall,
            frame_width: 640,
        }
    }

    fn with_mode(arbitration: ArbitrationMode) -> SteerCtrl {
        SteerCtrl::new(Params {
            arbitration,
            ..Default::default()
        })
    }

    #[test]
    fn test_found_consumes_correction() {
        let mut steer_ctrl = SteerCtrl::new(Params::default());
        steer_ctrl.post_correction(6.0);

        let (out, report) = steer_ctrl.proc(&input(FOUND, None)).unwrap();

        assert_eq!(out.command, SteeringCommand::new(-54.0, 12.0));
        assert_eq!(out.emissions, vec![out.command]);
        assert_eq!(report.correction_before, 6.0);
        assert_eq!(report.correction_after, 0.0);
        assert_eq!(steer_ctrl.correction(), 0.0);
    }

    #[test]
    fn test_not_found_holds_correction() {
        let mut steer_ctrl = SteerCtrl::new(Params::default());
        steer_ctrl.post_correction(-54.0);

        for _ in 0..3 {
            let (out, _) = steer_ctrl
                .proc(&input(LaneEstimate::not_found(), None))
                .unwrap();
            assert_eq!(out.command.angle, -54.0);
            assert_eq!(steer_ctrl.correction(), -54.0);
        }
    }

    #[test]
    fn test_blank_found_blank() {
        let mut steer_ctrl = SteerCtrl::new(Params::default());
        let lost = input(LaneEstimate::not_found(), None);

        let angles: Vec<f64> = [lost, input(FOUND, None), lost]
            .iter()
            .map(|i| steer_ctrl.proc(i).unwrap().0.command.angle)
            .collect();

        assert_eq!(angles, vec![0.0, -60.0, 0.0]);
    }

    #[test]
    fn test_view_centre_and_floor() {
        let mut steer_ctrl = SteerCtrl::new(Params {
            view_centre: Some(0),
            ..Default::default()
        });

        // Midpoint of -3 and 0 is floored to -2
        let lane = LaneEstimate {
            found: true,
            x_left: -3,
            x_right: 0,
        };
        let (out, _) = steer_ctrl.proc(&input(lane, None)).unwrap();
        assert_eq!(out.command.angle, -1.0);
    }

    #[test]
    fn test_sequenced() {
        let wall = SteeringCommand::new(50.0, 12.0);
        let mut steer_ctrl = with_mode(ArbitrationMode::Sequenced);

        let (out, report) = steer_ctrl.proc(&input(FOUND, Some(wall))).unwrap();
        assert_eq!(out.emissions, vec![wall, SteeringCommand::new(-60.0, 12.0)]);
        assert_eq!(out.command.angle, -60.0);
        assert!(report.wall_emitted);

        // The lane command still wins when the lane is lost
        let (out, _) = steer_ctrl
            .proc(&input(LaneEstimate::not_found(), Some(wall)))
            .unwrap();
        assert_eq!(out.emissions.len(), 2);
        assert_eq!(out.command.angle, 0.0);
    }

    #[test]
    fn test_wall_fallback() {
        let wall = SteeringCommand::new(-50.0, 12.0);
        let mut steer_ctrl = with_mode(ArbitrationMode::WallFallback);
        steer_ctrl.post_correction(4.0);

        let (out, _) = steer_ctrl.proc(&input(FOUND, Some(wall))).unwrap();
        assert_eq!(out.emissions, vec![SteeringCommand::new(-56.0, 12.0)]);

        let (out, report) = steer_ctrl
            .proc(&input(LaneEstimate::not_found(), Some(wall)))
            .unwrap();
        assert_eq!(out.emissions, vec![wall]);
        assert!(report.wall_emitted);

        let (out, _) = steer_ctrl
            .proc(&input(LaneEstimate::not_found(), None))
            .unwrap();
        assert_eq!(out.command, SteeringCommand::new(0.0, 12.0));
    }

    #[test]
    fn test_lane_only() {
        let wall = SteeringCommand::new(50.0, 12.0);
        let mut steer_ctrl = with_mode(ArbitrationMode::LaneOnly);

        let (out, report) = steer_ctrl.proc(&input(FOUND, Some(wall))).unwrap();
        assert_eq!(out.emissions, vec![SteeringCommand::new(-60.0, 12.0)]);
        assert!(!report.wall_emitted);
    }
}
