use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::clock::Clock;
use crate::stats::{AddressFamily, Result, TcpConnectionSnapshot, TcpStateParser};

/// A value and the clock reading up to which it may be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedSnapshot<T> {
    pub value: T,
    pub valid_until: Duration,
}

/// Serves the TCP snapshot of one address family, re-parsing at most once per
/// sampling interval.
///
/// The lock is held across the staleness check and the refresh, so concurrent callers
/// wait for the single in-flight parse and then share its result.
pub struct TcpStateCache {
    family: AddressFamily,
    parser: TcpStateParser,
    clock: Arc<dyn Clock>,
    sampling_interval: Duration,
    cached: Mutex<Option<CachedSnapshot<TcpConnectionSnapshot>>>,
}

impl std::fmt::Debug for TcpStateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpStateCache")
            .field("family", &self.family)
            .field("sampling_interval", &self.sampling_interval)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

impl TcpStateCache {
    pub fn new(
        family: AddressFamily,
        parser: TcpStateParser,
        clock: Arc<dyn Clock>,
        sampling_interval: Duration,
    ) -> Self {
        Self {
            family,
            parser,
            clock,
            sampling_interval,
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached snapshot, refreshing it first if it has expired.
    ///
    /// A failed refresh leaves the previous entry in place and returns the error.
    pub fn get(&self) -> Result<TcpConnectionSnapshot> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        match cached.as_ref() {
            Some(entry) if now < entry.valid_until => return Ok(entry.value),
            _ => {}
        }

        let value = self.parser.snapshot(self.family)?;
        *cached = Some(CachedSnapshot {
            value,
            valid_until: now + self.sampling_interval,
        });
        log::trace!(
            "refreshed {} TCP snapshot: {} sockets",
            self.family,
            value.total()
        );

        Ok(value)
    }
}
