//! # Drive manager
//!
//! Runs the control loop. The manager has two phases:
//!
//! - `Init` - Waits for the first camera frame and range sample, stops the vehicle, waits for the
//!   settle delay and applies the camera exposure.
//! - `Run` - Each cycle takes the latest sensor data, runs the processing modules in order,
//!   emits the resulting commands and archives the cycle telemetry.
//!
//! Nothing that happens during a cycle stops the loop. Errors are logged and the next cycle runs
//! as normal.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::{
    data_store::DataStore,
    lane_det::LaneEstimate,
    params::DriveExecParams,
    sensor_if::{ExposureCtrl, MotorError, MotorSink, SensorSlot},
    steer_ctrl,
};
use comms_if::eqpt::{
    cam::{is_empty_frame, CamImage},
    motor::SteeringCommand,
    ultra::RangeSample,
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::Session,
    time::{CycleEnd, CycleTimer},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How often the settle delay checks the shutdown flag.
const SETTLE_POLL_PERIOD: Duration = Duration::from_millis(50);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drive manager
pub struct DriveMgr {
    params: DriveExecParams,

    phase: DrivePhase,

    /// Module states and per-cycle data.
    pub ds: DataStore,

    cam_slot: SensorSlot<CamImage>,
    range_slot: SensorSlot<RangeSample>,

    motor: Box<dyn MotorSink>,
    exposure: Box<dyn ExposureCtrl>,

    arch_cycles: Option<Archiver>,
    overlay_dir: Option<PathBuf>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrivePhase {
    Init,
    Run,
}

#[derive(Debug, thiserror::Error)]
pub enum DriveMgrError {
    #[error("Could not create the cycle archive: {0}")]
    ArchiveInitError(ArchiveError),

    #[error("Could not create the overlay directory: {0}")]
    OverlayDirError(std::io::Error),

    #[error("Could not write the cycle archive: {0}")]
    ArchiveError(ArchiveError),

    #[error("Could not send the stop command: {0}")]
    StopError(MotorError),

    #[error("Cannot run a cycle before initialisation is complete")]
    NotInitialised,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveMgr {
    /// Create a new manager around a set of initialised modules.
    pub fn new(
        params: DriveExecParams,
        ds: DataStore,
        cam_slot: SensorSlot<CamImage>,
        range_slot: SensorSlot<RangeSample>,
        motor: Box<dyn MotorSink>,
        exposure: Box<dyn ExposureCtrl>,
    ) -> Self {
        Self {
            params,
            phase: DrivePhase::Init,
            ds,
            cam_slot,
            range_slot,
            motor,
            exposure,
            arch_cycles: None,
            overlay_dir: None,
        }
    }

    /// Archive cycle records, and overlays if enabled, into the session.
    pub fn enable_archives(&mut self, session: &Session) -> Result<(), DriveMgrError> {
        self.arch_cycles = Some(
            Archiver::from_path(session, "drive/cycles.csv")
                .map_err(DriveMgrError::ArchiveInitError)?,
        );

        if self.params.overlay_period_cycles > 0 {
            let dir = session.session_root.join("overlays");
            std::fs::create_dir_all(&dir).map_err(DriveMgrError::OverlayDirError)?;
            self.overlay_dir = Some(dir);
        }

        Ok(())
    }

    pub fn phase(&self) -> DrivePhase {
        self.phase
    }

    /// The latest stopline signal.
    pub fn is_stopline(&self) -> bool {
        self.ds.is_stopline
    }

    /// Run the initialisation phase and then cycle until `shutdown` is set.
    ///
    /// A stop command is sent on the way out.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), DriveMgrError> {
        if !self.init_phase(shutdown)? {
            info!("Shutdown requested during initialisation");
            return Ok(());
        }

        info!("Beginning main loop\n");

        let mut timer = CycleTimer::new(Duration::from_secs_f64(self.params.cycle_period_s));

        while !shutdown.load(Ordering::Relaxed) {
            if let Err(e) = self.cycle() {
                warn!("Cycle {} error: {}", self.ds.num_cycles, e);
            }

            self.ds.num_cycles += 1;

            if let CycleEnd::Overrun(d) = timer.wait() {
                warn!(
                    "Cycle overran by {:.06} s ({} consecutive)",
                    d.as_secs_f64(),
                    timer.num_consec_overruns()
                );
            }
        }

        info!("Shutdown requested after {} cycles, stopping", self.ds.num_cycles);
        info!(
            "{} frames and {} range samples received",
            self.cam_slot.seq(),
            self.range_slot.seq()
        );

        self.motor
            .emit(&SteeringCommand::stop())
            .map_err(DriveMgrError::StopError)
    }

    /// Wait for the sensors, stop the vehicle, settle, and set the exposure.
    ///
    /// Returns `Ok(false)` if shutdown was requested before initialisation completed.
    pub fn init_phase(&mut self, shutdown: &AtomicBool) -> Result<bool, DriveMgrError> {
        info!("Waiting for the first camera frame");
        if !self.cam_slot.wait_for_first(shutdown) {
            return Ok(false);
        }

        info!("Waiting for the first range sample");
        if !self.range_slot.wait_for_first(shutdown) {
            return Ok(false);
        }

        self.motor
            .emit(&SteeringCommand::stop())
            .map_err(DriveMgrError::StopError)?;

        info!("Sensors up, settling for {} s", self.params.settle_delay_s);
        let settle_end =
            Instant::now() + Duration::from_secs_f64(self.params.settle_delay_s.max(0.0));
        while Instant::now() < settle_end {
            if shutdown.load(Ordering::Relaxed) {
                return Ok(false);
            }
            thread::sleep(SETTLE_POLL_PERIOD.min(settle_end - Instant::now()));
        }

        // A camera without exposure control still gives usable frames
        match self.exposure.set_exposure(self.params.exposure) {
            Ok(()) => info!("Exposure set to {}", self.params.exposure),
            Err(e) => warn!("Could not set the exposure: {}", e),
        }

        self.phase = DrivePhase::Run;

        info!("Initialisation complete");

        Ok(true)
    }

    /// Execute one control cycle, returning the authoritative command.
    pub fn cycle(&mut self) -> Result<SteeringCommand, DriveMgrError> {
        if self.phase != DrivePhase::Run {
            return Err(DriveMgrError::NotInitialised);
        }

        self.ds.cycle_start();

        self.acquire();
        self.estimate();

        let cmd = self.steer(self.ds.frame_prep.frame().width());

        // ---- TELEMETRY ----

        self.save_overlay();

        self.ds.last_record = Some(self.ds.cycle_record(&cmd));
        self.write().map_err(DriveMgrError::ArchiveError)?;

        Ok(cmd)
    }

    /// Take the latest frame, if there is a new one, and the latest range sample.
    fn acquire(&mut self) {
        if let Some((seq, raw)) = self.cam_slot.latest_since(self.ds.frame_seq) {
            self.ds.frame_seq = seq;
            self.ds.new_frame = true;
            // Rotation cannot fail
            self.ds.frame_prep.proc(&raw).ok();
        }

        self.ds.range_sample = self.range_slot.latest();
    }

    /// Run the wall, lane and stopline estimators on the current data.
    ///
    /// An estimator error leaves that estimate at its not found value for this cycle.
    fn estimate(&mut self) {
        self.ds.wall_cmd = match self.ds.wall_prox.proc(&self.ds.range_sample) {
            Ok((c, _)) => c,
            Err(e) => {
                warn!("WallProx error: {}", e);
                None
            }
        };

        let frame = self.ds.frame_prep.frame();

        match self.ds.lane_det.proc(frame) {
            Ok((e, r)) => {
                self.ds.lane_estimate = e;
                self.ds.lane_det_report = r;
            }
            Err(e) => warn!("LaneDet error: {}", e),
        }

        match self.ds.stopline.proc(frame) {
            Ok((s, r)) => {
                if s && !self.ds.is_stopline {
                    info!("Stopline detected");
                }
                self.ds.is_stopline = s;
                self.ds.stopline_report = r;
            }
            Err(e) => warn!("StoplineDet error: {}", e),
        }
    }

    /// Fuse the cycle's estimates and emit the resulting commands in order.
    fn steer(&mut self, frame_width: u32) -> SteeringCommand {
        let input = steer_ctrl::InputData {
            lane: self.ds.lane_estimate,
            wall: self.ds.wall_cmd,
            frame_width,
        };

        let (output, report) = match self.ds.steer_ctrl.proc(&input) {
            Ok(o) => o,
            Err(e) => match e {},
        };

        for cmd in output.emissions.iter() {
            if let Err(e) = self.motor.emit(cmd) {
                warn!("Could not emit {:?}: {}", cmd, e);
            }
        }

        let cmd = output.command;
        info!("Angle: {}, Speed: {}", cmd.angle, cmd.speed);

        self.ds.steer_ctrl_output = Some(output);
        self.ds.steer_ctrl_report = report;

        cmd
    }

    /// Save the working frame with the lane candidates drawn on, if this is an overlay cycle.
    fn save_overlay(&self) {
        let dir = match self.overlay_dir {
            Some(ref d) => d,
            None => return,
        };

        let period = self.params.overlay_period_cycles;
        let frame = self.ds.frame_prep.frame();

        if period == 0 || self.ds.num_cycles % period != 0 || is_empty_frame(frame) {
            return;
        }

        let path = dir.join(format!("cycle_{:06}.png", self.ds.num_cycles));

        let overlay = match self.ds.lane_det.overlay(frame) {
            Ok(o) => o,
            Err(e) => {
                warn!("Could not draw overlay {:?}: {}", path, e);
                return;
            }
        };

        match overlay.save(&path) {
            Ok(()) => debug!("Overlay saved to {:?}", path),
            Err(e) => warn!("Could not save overlay {:?}: {}", path, e),
        }
    }

    /// The lane estimate of the last cycle.
    pub fn lane_estimate(&self) -> LaneEstimate {
        self.ds.lane_estimate
    }
}

impl Archived for DriveMgr {
    fn write(&mut self) -> Result<(), ArchiveError> {
        match (self.arch_cycles.as_mut(), self.ds.last_record) {
            (Some(arch), Some(record)) => arch.serialise(record),
            _ => Ok(()),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{frame_prep::rotate, sensor_if::ExposureError};
    use comms_if::eqpt::cam::Frame;
    use image::Rgb;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Clone, Default)]
    struct Recorder {
        cmds: Rc<RefCell<Vec<SteeringCommand>>>,
        exposures: Rc<RefCell<Vec<i32>>>,
    }

    impl MotorSink for Recorder {
        fn emit(&mut self, cmd: &SteeringCommand) -> Result<(), MotorError> {
            self.cmds.borrow_mut().push(*cmd);
            Ok(())
        }
    }

    impl ExposureCtrl for Recorder {
        fn set_exposure(&mut self, value: i32) -> Result<(), ExposureError> {
            self.exposures.borrow_mut().push(value);
            Err(ExposureError::OutOfRange(value))
        }
    }

    struct Rig {
        mgr: DriveMgr,
        cam: SensorSlot<CamImage>,
        range: SensorSlot<RangeSample>,
        rec: Recorder,
    }

    fn rig() -> Rig {
        let cam = SensorSlot::new();
        let range = SensorSlot::new();
        let rec = Recorder::default();

        let params = DriveExecParams {
            settle_delay_s: 0.0,
            ..Default::default()
        };

        let mgr = DriveMgr::new(
            params,
            DataStore::default(),
            cam.clone(),
            range.clone(),
            Box::new(rec.clone()),
            Box::new(rec.clone()),
        );

        Rig {
            mgr,
            cam,
            range,
            rec,
        }
    }

    /// Publish a frame as the camera would see it, upside down.
    fn publish(cam: &SensorSlot<CamImage>, frame: &Frame) {
        cam.publish(CamImage {
            timestamp: chrono::Utc::now(),
            image: rotate(frame),
        });
    }

    /// Yellow left line and white right line, centred on x = 100 and x = 300.
    fn lane_frame() -> Frame {
        Frame::from_fn(640, 480, |x, y| {
            let (x, y) = (x as i32, y as i32);
            if y < 290 || y > 450 {
                Rgb([0, 0, 0])
            } else if (x + y - 470).abs() <= 3 {
                Rgb([255, 255, 0])
            } else if (x - y + 70).abs() <= 3 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn test_init_phase() {
        let mut rig = rig();
        rig.cam.publish(CamImage::empty());
        rig.range.publish(RangeSample::new([0, 40, 0, 40]));

        assert!(matches!(rig.mgr.cycle(), Err(DriveMgrError::NotInitialised)));

        // A failed exposure does not stop initialisation
        assert!(rig.mgr.init_phase(&AtomicBool::new(false)).unwrap());
        assert_eq!(rig.mgr.phase(), DrivePhase::Run);
        assert_eq!(*rig.rec.cmds.borrow(), vec![SteeringCommand::stop()]);
        assert_eq!(*rig.rec.exposures.borrow(), vec![100]);
    }

    #[test]
    fn test_init_shutdown() {
        let mut rig = rig();
        let shutdown = AtomicBool::new(true);

        // No data ever arrives
        assert!(!rig.mgr.init_phase(&shutdown).unwrap());
        assert!(rig.mgr.run(&shutdown).is_ok());
        assert!(rig.rec.cmds.borrow().is_empty());
        assert_eq!(rig.mgr.phase(), DrivePhase::Init);
    }

    #[test]
    fn test_empty_lane_blank() {
        let mut rig = rig();
        rig.cam.publish(CamImage::empty());
        rig.range.publish(RangeSample::new([0, 40, 0, 40]));
        rig.mgr.init_phase(&AtomicBool::new(false)).unwrap();

        // Empty frame
        let cmd = rig.mgr.cycle().unwrap();
        assert_eq!(cmd, SteeringCommand::new(0.0, 12.0));
        assert!(!rig.mgr.lane_estimate().found);

        // Lanes at 100 and 300 in a 640 wide frame, midpoint 200 is 120 left of centre
        rig.mgr.ds.lane_estimate = LaneEstimate {
            found: true,
            x_left: 100,
            x_right: 300,
        };
        let cmd = rig.mgr.steer(640);
        assert_eq!(cmd.angle, -60.0);
        assert_eq!(cmd.speed, 12.0);
        assert_eq!(rig.mgr.ds.steer_ctrl.correction(), 0.0);

        // Blank frame, the correction was consumed
        publish(&rig.cam, &Frame::new(640, 480));
        let cmd = rig.mgr.cycle().unwrap();
        assert_eq!(cmd.angle, 0.0);
        assert!(!rig.mgr.lane_estimate().found);

        // Wall then lane each time, plus the initial stop
        let cmds = rig.rec.cmds.borrow();
        assert_eq!(cmds.len(), 1 + 3 * 2);
        assert_eq!(cmds[1], SteeringCommand::new(0.0, 12.0));
        assert_eq!(cmds[4], SteeringCommand::new(-60.0, 12.0));
    }

    #[test]
    fn test_lane_frame_steers_left() {
        let mut rig = rig();
        publish(&rig.cam, &lane_frame());
        rig.range.publish(RangeSample::new([0, 40, 0, 40]));
        rig.mgr.init_phase(&AtomicBool::new(false)).unwrap();

        // Detected lines sit close to 100 and 300
        let cmd = rig.mgr.cycle().unwrap();
        let est = rig.mgr.lane_estimate();
        assert!(est.found);
        assert!((est.x_left - 100).abs() <= 15, "{:?}", est);
        assert!((est.x_right - 300).abs() <= 15, "{:?}", est);
        assert!((cmd.angle + 60.0).abs() <= 10.0, "{:?}", cmd);
        assert_eq!(rig.mgr.ds.steer_ctrl.correction(), 0.0);

        let record = rig.mgr.ds.last_record.unwrap();
        assert!(record.new_frame);
        assert!(record.frame_age_s.unwrap() >= 0.0);
    }

    #[test]
    fn test_frame_retained_and_stopline() {
        let mut rig = rig();

        // Bright band across the lower part of the frame as seen after rotation
        let stopline = Frame::from_fn(640, 480, |_, y| {
            if y >= 400 && y < 420 {
                Rgb([250, 250, 250])
            } else {
                Rgb([0, 0, 0])
            }
        });
        publish(&rig.cam, &stopline);
        rig.range.publish(RangeSample::new([0, 50, 0, 30]));
        rig.mgr.init_phase(&AtomicBool::new(false)).unwrap();

        rig.mgr.cycle().unwrap();
        assert!(rig.mgr.ds.new_frame);
        assert!(rig.mgr.is_stopline());

        // No new frame, the working frame is kept
        rig.mgr.cycle().unwrap();
        assert!(!rig.mgr.ds.new_frame);
        assert!(rig.mgr.is_stopline());
        assert_eq!(*rig.mgr.ds.frame_prep.frame(), stopline);

        // The wall command is emitted before the lane command
        assert_eq!(rig.mgr.ds.wall_cmd, Some(SteeringCommand::new(-50.0, 12.0)));
        assert_eq!(rig.rec.cmds.borrow()[1].angle, -50.0);
    }
}
