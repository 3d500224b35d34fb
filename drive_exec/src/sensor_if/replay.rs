//! # Replay data source
//!
//! Plays back a directory of stored camera frames and a CSV file of range samples into the
//! sensor slots, standing in for the camera and ultrasonic drivers.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::SensorSlot;
use comms_if::eqpt::{
    cam::{CamFrame, CamImage, ImageFormat},
    ultra::{RangeSample, NUM_ULTRA},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the replay source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayParams {
    /// Directory containing the frames, which are played in file name order.
    pub frames_dir: PathBuf,

    /// CSV file with one range sample per row and no header.
    pub ranges_file: PathBuf,

    /// Time between published frames.
    ///
    /// Units: seconds
    pub frame_period_s: f64,

    /// Time between published range samples.
    ///
    /// Units: seconds
    pub range_period_s: f64,

    /// Start again from the beginning once all data has been played.
    pub looping: bool,
}

/// A running replay.
pub struct ReplaySource {
    frame_handle: Option<JoinHandle<()>>,
    range_handle: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Could not read the frames directory {0:?}: {1}")]
    DirError(PathBuf, std::io::Error),

    #[error("No supported frames found in {0:?}")]
    NoFrames(PathBuf),

    #[error("Could not read the range samples: {0}")]
    CsvError(csv::Error),

    #[error("No range samples found in {0:?}")]
    NoRanges(PathBuf),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReplaySource {
    /// Start the replay threads.
    ///
    /// The frame list and all range samples are read before the threads start, so missing data
    /// is reported here rather than in the background.
    pub fn start(
        params: &ReplayParams,
        cam_slot: SensorSlot<CamImage>,
        range_slot: SensorSlot<RangeSample>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, ReplayError> {
        let frames = list_frames(&params.frames_dir)?;
        let ranges = read_ranges(&params.ranges_file)?;

        info!(
            "Replaying {} frames from {:?} and {} range samples from {:?}",
            frames.len(),
            params.frames_dir,
            ranges.len(),
            params.ranges_file
        );

        let frame_period = Duration::from_secs_f64(params.frame_period_s.max(0.0));
        let range_period = Duration::from_secs_f64(params.range_period_s.max(0.0));
        let looping = params.looping;

        let frame_shutdown = shutdown.clone();
        let frame_handle = thread::spawn(move || {
            play(&frames, frame_period, looping, &frame_shutdown, |(path, format)| {
                if let Some(image) = load_frame(path, *format) {
                    cam_slot.publish(image);
                }
            })
        });

        let range_handle = thread::spawn(move || {
            play(&ranges, range_period, looping, &shutdown, |dists| {
                range_slot.publish(RangeSample::new(*dists));
            })
        });

        Ok(Self {
            frame_handle: Some(frame_handle),
            range_handle: Some(range_handle),
        })
    }

    /// Start replaying only the range samples, for when frames come from the camera.
    pub fn start_ranges(
        params: &ReplayParams,
        range_slot: SensorSlot<RangeSample>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, ReplayError> {
        let ranges = read_ranges(&params.ranges_file)?;

        info!(
            "Replaying {} range samples from {:?}",
            ranges.len(),
            params.ranges_file
        );

        let range_period = Duration::from_secs_f64(params.range_period_s.max(0.0));
        let looping = params.looping;

        let range_handle = thread::spawn(move || {
            play(&ranges, range_period, looping, &shutdown, |dists| {
                range_slot.publish(RangeSample::new(*dists));
            })
        });

        Ok(Self {
            frame_handle: None,
            range_handle: Some(range_handle),
        })
    }

    /// Wait for both replay threads to finish.
    pub fn join(mut self) {
        for handle in [self.frame_handle.take(), self.range_handle.take()].iter_mut() {
            if let Some(h) = handle.take() {
                if h.join().is_err() {
                    warn!("Replay thread panicked");
                }
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Publish each item in turn until the end of the data or shutdown.
fn play<T, F>(items: &[T], period: Duration, looping: bool, shutdown: &AtomicBool, mut publish: F)
where
    F: FnMut(&T),
{
    loop {
        for item in items {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }

            publish(item);
            thread::sleep(period);
        }

        if !looping {
            debug!("Replay data exhausted");
            return;
        }
    }
}

/// List the supported frame files in a directory, sorted by name.
fn list_frames(dir: &Path) -> Result<Vec<(PathBuf, ImageFormat)>, ReplayError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ReplayError::DirError(dir.to_path_buf(), e))?;

    let mut frames = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ReplayError::DirError(dir.to_path_buf(), e))?
            .path();

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension);

        if let Some(f) = format {
            frames.push((path, f));
        }
    }

    if frames.is_empty() {
        return Err(ReplayError::NoFrames(dir.to_path_buf()));
    }

    frames.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(frames)
}

/// Read all range samples from a headerless CSV file.
fn read_ranges(path: &Path) -> Result<Vec<[i32; NUM_ULTRA]>, ReplayError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(ReplayError::CsvError)?;

    let mut ranges = Vec::new();
    for record in reader.deserialize() {
        let dists: [i32; NUM_ULTRA] = record.map_err(ReplayError::CsvError)?;
        ranges.push(dists);
    }

    if ranges.is_empty() {
        return Err(ReplayError::NoRanges(path.to_path_buf()));
    }

    Ok(ranges)
}

/// Load and decode a frame, or `None` if it could not be read.
fn load_frame(path: &Path, format: ImageFormat) -> Option<CamImage> {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) => {
            warn!("Could not read frame {:?}: {}", path, e);
            return None;
        }
    };

    let frame = CamFrame {
        timestamp: Utc::now(),
        format,
        data,
    };

    match frame.to_cam_image() {
        Ok(i) => Some(i),
        Err(e) => {
            warn!("Skipping frame {:?}: {}", path, e);
            None
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::cam::Frame;
    use image::Rgb;

    fn replay_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("replay_test_{}_{}", name, std::process::id()));
        let frames = dir.join("frames");
        std::fs::create_dir_all(&frames).unwrap();

        Frame::from_pixel(4, 4, Rgb([10, 20, 30]))
            .save(frames.join("000.png"))
            .unwrap();
        std::fs::write(frames.join("001.jpg"), b"not a jpeg").unwrap();
        Frame::from_pixel(4, 4, Rgb([200, 0, 0]))
            .save(frames.join("002.png"))
            .unwrap();
        std::fs::write(frames.join("notes.txt"), b"ignored").unwrap();

        std::fs::write(dir.join("ranges.csv"), "10, 50, 10, 30\n10, 40, 10, 40\n").unwrap();

        dir
    }

    fn params(dir: &Path) -> ReplayParams {
        ReplayParams {
            frames_dir: dir.join("frames"),
            ranges_file: dir.join("ranges.csv"),
            frame_period_s: 0.001,
            range_period_s: 0.001,
            looping: false,
        }
    }

    #[test]
    fn test_replay_skips_bad_frames() {
        let dir = replay_dir("skip");
        let cam_slot = SensorSlot::new();
        let range_slot = SensorSlot::new();

        let replay = ReplaySource::start(
            &params(&dir),
            cam_slot.clone(),
            range_slot.clone(),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        replay.join();

        // The undecodable frame is never published
        assert_eq!(cam_slot.seq(), 2);
        let last = cam_slot.latest().unwrap();
        assert_eq!(*last.image.get_pixel(0, 0), Rgb([200, 0, 0]));

        assert_eq!(range_slot.seq(), 2);
        assert_eq!(range_slot.latest().unwrap().dists, [10, 40, 10, 40]);
    }

    #[test]
    fn test_ranges_only() {
        let dir = replay_dir("ranges");
        let range_slot = SensorSlot::new();

        let mut p = params(&dir);
        p.frames_dir = dir.join("nothing_here");

        let replay =
            ReplaySource::start_ranges(&p, range_slot.clone(), Arc::new(AtomicBool::new(false)))
                .unwrap();
        replay.join();

        assert_eq!(range_slot.seq(), 2);
    }

    #[test]
    fn test_missing_data() {
        let dir = replay_dir("missing");
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut p = params(&dir);
        p.frames_dir = dir.join("nothing_here");
        assert!(matches!(
            ReplaySource::start(&p, SensorSlot::new(), SensorSlot::new(), shutdown.clone()),
            Err(ReplayError::DirError(..))
        ));

        let mut p = params(&dir);
        p.frames_dir = dir.clone();
        std::fs::write(dir.join("empty.csv"), "").unwrap();
        p.ranges_file = dir.join("empty.csv");
        assert!(matches!(
            ReplaySource::start(&p, SensorSlot::new(), SensorSlot::new(), shutdown),
            Err(ReplayError::NoFrames(_))
        ));
    }
}
