//! TCP connection counts per address family, cached and guarded against hosts without
//! IPv4 or IPv6.
//!
//! # Key Components
//!
//! - [`TcpStateCache`] — re-parses a family's TCP table at most once per sampling interval.
//! - [`AvailabilityGuard`] — reports zero connections and stops reading for a while once a
//!   family's table turns out to be missing or unreadable.
//! - [`TcpConnectionMonitor`] — one cache and one guard per family.
mod availability;
mod cache;

pub use availability::AvailabilityGuard;
pub use cache::{CachedSnapshot, TcpStateCache};

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::stats::{AddressFamily, Result, TcpConnectionSnapshot, TcpState, TcpStateParser};

#[derive(Debug)]
struct FamilyTable {
    cache: TcpStateCache,
    guard: AvailabilityGuard,
}

impl FamilyTable {
    fn new(
        family: AddressFamily,
        parser: TcpStateParser,
        clock: Arc<dyn Clock>,
        sampling_interval: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            guard: AvailabilityGuard::new(
                format!("TCP table for {family}"),
                Arc::clone(&clock),
                retry_interval,
            ),
            cache: TcpStateCache::new(family, parser, clock, sampling_interval),
        }
    }

    fn snapshot(&self) -> Result<TcpConnectionSnapshot> {
        self.guard.poll(|| self.cache.get())
    }
}

/// Per-family TCP connection counts for a metrics layer to poll.
///
/// Each family has its own lock, so refreshing one never waits on the other.
#[derive(Debug)]
pub struct TcpConnectionMonitor {
    ipv4: FamilyTable,
    ipv6: FamilyTable,
}

impl TcpConnectionMonitor {
    pub fn new(
        parser: TcpStateParser,
        clock: Arc<dyn Clock>,
        sampling_interval: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            ipv4: FamilyTable::new(
                AddressFamily::Ipv4,
                parser.clone(),
                Arc::clone(&clock),
                sampling_interval,
                retry_interval,
            ),
            ipv6: FamilyTable::new(
                AddressFamily::Ipv6,
                parser,
                clock,
                sampling_interval,
                retry_interval,
            ),
        }
    }

    fn table(&self, family: AddressFamily) -> &FamilyTable {
        match family {
            AddressFamily::Ipv4 => &self.ipv4,
            AddressFamily::Ipv6 => &self.ipv6,
        }
    }

    /// Current counts for `family`; all zero while the family is unavailable.
    pub fn snapshot(&self, family: AddressFamily) -> Result<TcpConnectionSnapshot> {
        self.table(family).snapshot()
    }

    pub fn connection_count(&self, family: AddressFamily, state: TcpState) -> Result<u64> {
        self.snapshot(family).map(|snapshot| snapshot.count(state))
    }

    pub fn is_available(&self, family: AddressFamily) -> bool {
        self.table(family).guard.is_available()
    }
}
