//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Start the sensor producers (replay or camera)
//!     - Initialisation phase:
//!         - Wait for the first frame and range sample
//!         - Stop, settle and set the camera exposure
//!     - Main loop:
//!         - Frame preprocessing
//!         - Wall proximity estimation
//!         - Lane and stopline detection
//!         - Steering control
//!         - Command emission and archiving
//!
//! # Modules
//!
//! All modules (e.g. `lane_det`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
#[cfg(not(feature = "cam"))]
use color_eyre::eyre::eyre;
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use structopt::StructOpt;

// Internal
use drive_lib::{
    data_store::DataStore,
    drive_mgr::DriveMgr,
    params::{DataSource, DriveExecParams},
    sensor_if::{ExposureCtrl, LogMotor, NoExposure, ReplayParams, ReplaySource, SensorSlot},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Command line options
#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Lane and wall following control loop")]
struct Opt {
    /// Data source, either `replay` or `cam`. Overrides `drive_exec.toml`.
    #[structopt(long)]
    source: Option<DataSource>,

    /// Directory of frames to replay. Overrides `replay.toml`.
    #[structopt(long, parse(from_os_str))]
    frames: Option<PathBuf>,

    /// CSV file of range samples to replay. Overrides `replay.toml`.
    #[structopt(long, parse(from_os_str))]
    ranges: Option<PathBuf>,
}

/// Running sensor producers, joined on exit.
struct Producers {
    replay: ReplaySource,
    #[cfg(feature = "cam")]
    cam: Option<drive_lib::sensor_if::CamStream>,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Producers {
    /// Wait for every producer thread to finish.
    fn join(self) {
        self.replay.join();

        #[cfg(feature = "cam")]
        {
            if let Some(c) = self.cam {
                c.join();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Track Drive Executable\n");
    info!(
        "Running on: {}",
        host::get_hostname().wrap_err("Failed to get the host name")?
    );
    debug!(
        "Platform: {:#?}",
        host::get_uname().wrap_err("Failed to get platform information")?
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let mut params: DriveExecParams =
        util::params::load("drive_exec.toml").wrap_err("Could not load exec params")?;

    if let Some(s) = opt.source {
        params.source = s;
    }

    let mut replay_params: ReplayParams =
        util::params::load("replay.toml").wrap_err("Could not load replay params")?;

    if let Some(f) = opt.frames {
        replay_params.frames_dir = f;
    }
    if let Some(r) = opt.ranges {
        replay_params.ranges_file = r;
    }

    session.save("params/drive_exec.json", params.clone());
    session.save("params/replay.json", replay_params.clone());

    info!("Exec parameters loaded, data source: {:?}", params.source);

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.frame_prep
        .init((), &session)
        .wrap_err("Failed to initialise FramePrep")?;
    info!("FramePrep init complete");

    ds.lane_det
        .init("lane_det.toml", &session)
        .wrap_err("Failed to initialise LaneDet")?;
    info!("LaneDet init complete");

    ds.stopline
        .init("stopline.toml", &session)
        .wrap_err("Failed to initialise StoplineDet")?;
    info!("StoplineDet init complete");

    ds.wall_prox
        .init("wall_prox.toml", &session)
        .wrap_err("Failed to initialise WallProx")?;
    info!("WallProx init complete");

    ds.steer_ctrl
        .init("steer_ctrl.toml", &session)
        .wrap_err("Failed to initialise SteerCtrl")?;
    info!("SteerCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- SHUTDOWN HANDLING ----

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("Failed to set the Ctrl-C handler")?;
    }

    // ---- INITIALISE SENSORS ----

    let cam_slot = SensorSlot::new();
    let range_slot = SensorSlot::new();

    let (producers, exposure) =
        start_producers(&params, &replay_params, &cam_slot, &range_slot, &shutdown)?;

    let motor = LogMotor::new(&session).wrap_err("Failed to initialise the motor sink")?;

    // ---- MAIN LOOP ----

    let mut drive_mgr = DriveMgr::new(
        params,
        ds,
        cam_slot,
        range_slot,
        Box::new(motor),
        exposure,
    );

    drive_mgr
        .enable_archives(&session)
        .wrap_err("Failed to initialise the drive archives")?;

    let result = drive_mgr.run(&shutdown);

    // ---- SHUTDOWN ----

    shutdown.store(true, Ordering::Relaxed);

    producers.join();

    info!("End of execution");

    session.exit();

    result.wrap_err("Drive manager stopped with an error")
}

/// Start the sensor producers for the configured data source.
fn start_producers(
    params: &DriveExecParams,
    replay_params: &ReplayParams,
    cam_slot: &SensorSlot<comms_if::eqpt::cam::CamImage>,
    range_slot: &SensorSlot<comms_if::eqpt::ultra::RangeSample>,
    shutdown: &Arc<AtomicBool>,
) -> Result<(Producers, Box<dyn ExposureCtrl>), Report> {
    match params.source {
        DataSource::Replay => {
            let replay = ReplaySource::start(
                replay_params,
                cam_slot.clone(),
                range_slot.clone(),
                shutdown.clone(),
            )
            .wrap_err("Failed to start the replay")?;

            let exposure: Box<dyn ExposureCtrl> = Box::new(NoExposure);

            Ok((
                Producers {
                    replay,
                    #[cfg(feature = "cam")]
                    cam: None,
                },
                exposure,
            ))
        }
        #[cfg(feature = "cam")]
        DataSource::Cam => {
            use drive_lib::sensor_if::{CamParams, CamStream, V4l2Exposure};

            let cam_params: CamParams =
                util::params::load("cam.toml").wrap_err("Could not load cam params")?;

            let cam = CamStream::start(&cam_params, cam_slot.clone(), shutdown.clone())
                .wrap_err("Failed to start the camera")?;

            let replay =
                ReplaySource::start_ranges(replay_params, range_slot.clone(), shutdown.clone())
                    .wrap_err("Failed to start the range replay")?;

            let exposure: Box<dyn ExposureCtrl> =
                Box::new(V4l2Exposure::new(&params.exposure_device));

            Ok((
                Producers {
                    replay,
                    cam: Some(cam),
                },
                exposure,
            ))
        }
        #[cfg(not(feature = "cam"))]
        DataSource::Cam => Err(eyre!(
            "The camera data source requires drive_exec to be built with the `cam` feature"
        )),
    }
}
