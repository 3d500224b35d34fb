//! # Sensor slot
//!
//! A single value buffer shared between a sensor producer thread and the control loop. Each
//! publish overwrites the previous value and bumps a sequence number, so the reader can tell a
//! new sample from one it has already seen.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Condvar, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How often `wait_for_first` checks the shutdown flag.
const WAIT_POLL_PERIOD: Duration = Duration::from_millis(50);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Latest value wins buffer for one sensor.
///
/// Cloning the slot gives another handle to the same buffer.
pub struct SensorSlot<T> {
    inner: Arc<(Mutex<Latest<T>>, Condvar)>,
}

struct Latest<T> {
    value: Option<T>,

    /// Number of values published so far. Zero means nothing has been published.
    seq: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T> Clone for SensorSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for SensorSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SensorSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(Latest {
                    value: None,
                    seq: 0,
                }),
                Condvar::new(),
            )),
        }
    }

    /// Replace the value in the slot, returning its sequence number.
    pub fn publish(&self, value: T) -> u64 {
        let seq = {
            let mut latest = self.lock();
            latest.value = Some(value);
            latest.seq += 1;
            latest.seq
        };

        self.inner.1.notify_all();

        seq
    }

    /// Sequence number of the latest value, zero if nothing has been published.
    pub fn seq(&self) -> u64 {
        self.lock().seq
    }

    /// Block until the first value is published or `shutdown` is set.
    ///
    /// Returns `true` if a value is available.
    pub fn wait_for_first(&self, shutdown: &AtomicBool) -> bool {
        let (_, cvar) = &*self.inner;
        let mut latest = self.lock();

        while latest.seq == 0 {
            if shutdown.load(Ordering::Relaxed) {
                return false;
            }

            latest = match cvar.wait_timeout(latest, WAIT_POLL_PERIOD) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }

        true
    }

    fn lock(&self) -> MutexGuard<'_, Latest<T>> {
        // A producer panicking mid-publish cannot leave the value half written
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> SensorSlot<T> {
    /// A copy of the latest value.
    pub fn latest(&self) -> Option<T> {
        self.lock().value.clone()
    }

    /// The latest value and its sequence number, if it is newer than `seq`.
    pub fn latest_since(&self, seq: u64) -> Option<(u64, T)> {
        let latest = self.lock();

        match latest.value {
            Some(ref v) if latest.seq > seq => Some((latest.seq, v.clone())),
            _ => None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn test_latest_wins() {
        let slot = SensorSlot::new();
        assert_eq!(slot.latest(), None);
        assert_eq!(slot.seq(), 0);

        assert_eq!(slot.publish(1), 1);
        assert_eq!(slot.publish(2), 2);
        assert_eq!(slot.latest(), Some(2));
    }

    #[test]
    fn test_latest_since() {
        let slot = SensorSlot::new();
        assert_eq!(slot.latest_since(0), None);

        slot.publish("a");
        assert_eq!(slot.latest_since(0), Some((1, "a")));
        assert_eq!(slot.latest_since(1), None);

        slot.publish("b");
        slot.publish("c");
        assert_eq!(slot.latest_since(1), Some((3, "c")));
    }

    #[test]
    fn test_wait_for_first() {
        let slot = SensorSlot::new();
        let producer = slot.clone();
        let shutdown = AtomicBool::new(false);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.publish(7);
        });

        assert!(slot.wait_for_first(&shutdown));
        assert_eq!(slot.latest(), Some(7));

        handle.join().unwrap();
    }

    #[test]
    fn test_wait_for_first_shutdown() {
        let slot: SensorSlot<i32> = SensorSlot::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            flag.store(true, Ordering::Relaxed);
        });

        assert!(!slot.wait_for_first(&shutdown));

        handle.join().unwrap();
    }
}
