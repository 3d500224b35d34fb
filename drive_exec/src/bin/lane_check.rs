//! # Lane Check
//!
//! Runs lane and stopline detection on a single stored image and prints the result, for tuning
//! the detection parameters away from the vehicle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Result};
use std::path::PathBuf;
use structopt::StructOpt;

use drive_lib::{frame_prep::rotate, lane_det, stopline};
use util::{module::State, params};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "lane_check", about = "Run lane detection on a stored image")]
struct Opt {
    /// Image to process
    #[structopt(parse(from_os_str))]
    image: PathBuf,

    /// Lane detection parameter file, defaults are used if not given
    #[structopt(long, parse(from_os_str))]
    lane_params: Option<PathBuf>,

    /// Stopline detection parameter file, defaults are used if not given
    #[structopt(long, parse(from_os_str))]
    stopline_params: Option<PathBuf>,

    /// The image is straight from the camera and must be rotated first
    #[structopt(long)]
    raw: bool,

    /// Save the frame with the lane candidates drawn on to this path
    #[structopt(long, parse(from_os_str))]
    overlay: Option<PathBuf>,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    let lane_params: lane_det::Params = match opt.lane_params {
        Some(ref p) => params::load_from_path(p).wrap_err("Could not load lane params")?,
        None => lane_det::Params::default(),
    };
    lane_params
        .validate()
        .map_err(lane_det::LaneDetError::InvalidParams)?;

    let stopline_params: stopline::Params = match opt.stopline_params {
        Some(ref p) => params::load_from_path(p).wrap_err("Could not load stopline params")?,
        None => stopline::Params::default(),
    };

    let mut frame = image::open(&opt.image)
        .wrap_err_with(|| format!("Could not open {:?}", opt.image))?
        .to_rgb8();

    if opt.raw {
        frame = rotate(&frame);
    }

    let mut lane_det = lane_det::LaneDet::new(lane_params);
    let mut stopline = stopline::StoplineDet::new(stopline_params);

    let (estimate, report) = lane_det.proc(&frame)?;
    let (is_stopline, stopline_report) = stopline.proc(&frame)?;

    println!("{:?}: {}x{}", opt.image, frame.width(), frame.height());
    println!("Lane: {:?}", estimate);
    println!("    {:?}", report);
    for s in lane_det.candidates().left.iter() {
        println!("    left  {:?} slope {:?}", s, s.slope());
    }
    for s in lane_det.candidates().right.iter() {
        println!("    right {:?} slope {:?}", s, s.slope());
    }
    println!(
        "Stopline: {} ({} bright pixels)",
        is_stopline, stopline_report.num_bright
    );

    if let Some(ref path) = opt.overlay {
        lane_det
            .overlay(&frame)?
            .save(path)
            .wrap_err_with(|| format!("Could not save the overlay to {:?}", path))?;
        println!("Overlay saved to {:?}", path);
    }

    Ok(())
}
