//! Motor sink which logs and archives the demands

use log::debug;
use serde::Serialize;

use super::{MotorError, MotorSink};
use comms_if::eqpt::motor::SteeringCommand;
use util::{
    archive::Archiver,
    session::{self, Session},
};

/// Logs each command and archives it to `drive/motor_dems.csv`.
pub struct LogMotor {
    arch: Archiver,
    num_emitted: u64,
}

#[derive(Serialize)]
struct MotorDemRecord {
    num: u64,
    time_s: f64,
    angle: f64,
    speed: f64,
}

impl LogMotor {
    /// Create a motor sink archiving into the session.
    pub fn new(session: &Session) -> Result<Self, MotorError> {
        let arch = Archiver::from_path(session, "drive/motor_dems.csv")
            .map_err(MotorError::ArchiveError)?;

        Ok(Self::with_archiver(arch))
    }

    /// Create a motor sink writing to an existing archive.
    pub fn with_archiver(arch: Archiver) -> Self {
        Self {
            arch,
            num_emitted: 0,
        }
    }
}

impl MotorSink for LogMotor {
    fn emit(&mut self, cmd: &SteeringCommand) -> Result<(), MotorError> {
        debug!(
            "Motor demand {}: angle = {}, speed = {}",
            self.num_emitted, cmd.angle, cmd.speed
        );

        self.arch
            .serialise(MotorDemRecord {
                num: self.num_emitted,
                time_s: session::get_elapsed_seconds(),
                angle: cmd.angle,
                speed: cmd.speed,
            })
            .map_err(MotorError::ArchiveError)?;

        self.num_emitted += 1;

        Ok(())
    }
}
