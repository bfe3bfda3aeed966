use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::clock::{Clock, duration_to_nanos};
use crate::stats::Result;

/// Backs off from an optional subsystem whose files are missing or unreadable.
///
/// While available, every poll runs the read. A read failing with
/// [`crate::stats::SensorError::is_unavailable`] flips the guard to unavailable and yields
/// `T::default()`. Until `retry_interval` has passed since that failure, polls return
/// `T::default()` without reading. The first successful read after the cooldown makes
/// the guard available again. Any other error is returned unchanged.
///
/// State lives in atomics so polling never blocks. Two pollers racing right after the
/// cooldown may both attempt a read.
pub struct AvailabilityGuard {
    name: String,
    clock: Arc<dyn Clock>,
    retry_interval: Duration,
    unavailable: AtomicBool,
    last_failure_at: AtomicU64,
}

impl std::fmt::Debug for AvailabilityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityGuard")
            .field("name", &self.name)
            .field("retry_interval", &self.retry_interval)
            .field("unavailable", &self.unavailable)
            .field("last_failure_at", &self.last_failure_at)
            .finish_non_exhaustive()
    }
}

impl AvailabilityGuard {
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>, retry_interval: Duration) -> Self {
        Self {
            name: name.into(),
            clock,
            retry_interval,
            unavailable: AtomicBool::new(false),
            last_failure_at: AtomicU64::new(0),
        }
    }

    pub fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::Acquire)
    }

    /// Runs `read` unless the guard is cooling down.
    pub fn poll<T, F>(&self, read: F) -> Result<T>
    where
        T: Default,
        F: FnOnce() -> Result<T>,
    {
        let now = self.clock.now();
        if self.unavailable.load(Ordering::Acquire) {
            let last_failure = Duration::from_nanos(self.last_failure_at.load(Ordering::Acquire));
            if now.saturating_sub(last_failure) <= self.retry_interval {
                return Ok(T::default());
            }
        }

        match read() {
            Ok(value) => {
                if self.unavailable.swap(false, Ordering::AcqRel) {
                    log::info!("{} is available again", self.name);
                }
                Ok(value)
            }
            Err(err) if err.is_unavailable() => {
                self.last_failure_at.store(duration_to_nanos(now), Ordering::Release);
                if self.unavailable.swap(true, Ordering::AcqRel) {
                    log::debug!("{} is still unavailable: {}", self.name, err);
                } else {
                    log::warn!(
                        "{} is unavailable, retrying in {:?}: {}",
                        self.name,
                        self.retry_interval,
                        err
                    );
                }
                Ok(T::default())
            }
            Err(err) => Err(err),
        }
    }
}
