//! Wall proximity module
//!
//! Compares the left and right ultrasonic distances and steers away from the closer wall. The
//! decision is discrete. The bias is applied in full whichever side is further, regardless of by
//! how much.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use std::cmp::Ordering;

pub use params::*;

use comms_if::eqpt::{
    motor::SteeringCommand,
    ultra::{RangeSample, NUM_ULTRA},
};
use util::{module::State, params as util_params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct WallProx {
    params: Params,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during WallProx operation.
#[derive(Debug, thiserror::Error)]
pub enum WallProxError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util_params::LoadError),

    #[error("Sensor index {0} is out of range, there are only {} sensors", NUM_ULTRA)]
    InvalidIndex(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for WallProx {
    type InitData = &'static str;
    type InitError = WallProxError;

    type InputData = Option<RangeSample>;
    type OutputData = Option<SteeringCommand>;
    type StatusReport = ();
    type ProcError = WallProxError;

    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = util_params::load(init_data).map_err(WallProxError::ParamLoadError)?;
        *self = Self::new(params)?;
        Ok(())
    }

    /// Steer away from the closer wall. No sample gives no command.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let sample = match input_data {
            Some(s) => s,
            None => return Ok((None, ())),
        };

        let left = sample
            .dist(self.params.left_index)
            .ok_or(WallProxError::InvalidIndex(self.params.left_index))?;
        let right = sample
            .dist(self.params.right_index)
            .ok_or(WallProxError::InvalidIndex(self.params.right_index))?;

        let angle = match left.cmp(&right) {
            Ordering::Greater => -self.params.steer_bias,
            Ordering::Less => self.params.steer_bias,
            Ordering::Equal => 0.0,
        };

        trace!("WallProx: left = {}, right = {}, angle = {}", left, right, angle);

        Ok((Some(SteeringCommand::new(angle, self.params.speed)), ()))
    }
}

impl WallProx {
    /// Create a new instance, checking the sensor indices exist.
    pub fn new(params: Params) -> Result<Self, WallProxError> {
        for &i in [params.left_index, params.right_index].iter() {
            if i >= NUM_ULTRA {
                return Err(WallProxError::InvalidIndex(i));
            }
        }

        Ok(Self { params })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn steer(dists: [i32; NUM_ULTRA]) -> SteeringCommand {
        let mut wall_prox = WallProx::new(Params::default()).unwrap();
        wall_prox.proc(&Some(RangeSample::new(dists))).unwrap().0.unwrap()
    }

    #[test]
    fn test_bias() {
        assert_eq!(steer([0, 50, 0, 30]), SteeringCommand::new(-50.0, 12.0));
        assert_eq!(steer([0, 30, 0, 50]), SteeringCommand::new(50.0, 12.0));
        assert_eq!(steer([0, 40, 0, 40]), SteeringCommand::new(0.0, 12.0));

        // Magnitude does not depend on the difference
        assert_eq!(steer([99, 31, -5, 30]).angle, -50.0);
    }

    #[test]
    fn test_no_sample() {
        let mut wall_prox = WallProx::new(Params::default()).unwrap();
        assert_eq!(wall_prox.proc(&None).unwrap().0, None);
    }

    #[test]
    fn test_invalid_index() {
        let params = Params {
            right_index: NUM_ULTRA,
            ..Default::default()
        };
        assert!(matches!(
            WallProx::new(params),
            Err(WallProxError::InvalidIndex(4))
        ));
    }
}
