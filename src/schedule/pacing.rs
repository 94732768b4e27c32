use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PacingError {
    #[error("invalid delay range {min}..={max}: bounds must be finite, >= 0 and min <= max")]
    InvalidDelay { min: f64, max: f64 },
}

/// Inclusive range the inter-probe delay is drawn from, uniformly.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min_secs: f64, max_secs: f64) -> Result<Self, PacingError> {
        let invalid = PacingError::InvalidDelay {
            min: min_secs,
            max: max_secs,
        };
        // rejects negative, NaN, infinite and out-of-range values
        match (
            Duration::try_from_secs_f64(min_secs),
            Duration::try_from_secs_f64(max_secs),
        ) {
            (Ok(min), Ok(max)) if min <= max => Ok(Self { min, max }),
            _ => Err(invalid),
        }
    }

    /// Explicit "no delay" configuration.
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let secs = rng.gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max)
            .clamp(self.min, self.max)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(20),
            max: Duration::from_secs(30),
        }
    }
}

/// Shared stop flag. Cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Waits between probes.
pub trait Pacer {
    /// Blocks for up to `duration`; may return early once `cancel` fires.
    fn pause(&self, duration: Duration, cancel: &CancelToken);
}

impl<P: Pacer + ?Sized> Pacer for &P {
    fn pause(&self, duration: Duration, cancel: &CancelToken) {
        (**self).pause(duration, cancel)
    }
}

/// Sleeps on the current thread in short slices, checking for cancellation
/// between them.
#[derive(Debug, Clone, Copy)]
pub struct SleepPacer {
    slice: Duration,
}

impl SleepPacer {
    pub fn new(slice: Duration) -> Self {
        Self {
            slice: slice.max(Duration::from_millis(1)),
        }
    }
}

impl Default for SleepPacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl Pacer for SleepPacer {
    fn pause(&self, duration: Duration, cancel: &CancelToken) {
        // unrepresentable deadlines sleep until cancelled
        let deadline = Instant::now().checked_add(duration);
        loop {
            if cancel.is_cancelled() {
                return;
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.slice,
            };
            if remaining.is_zero() {
                return;
            }
            thread::sleep(remaining.min(self.slice));
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&self, _duration: Duration, _cancel: &CancelToken) {}
}
