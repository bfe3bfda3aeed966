use std::num::NonZeroU64;
use std::path::Path;

use super::Result;
use super::checks::{has_container_indicators, matches_container_cgroup, query_user_hz};

/// Available runtime environments for the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Running directly on the host.
    Host,
    /// Running inside a containerized environment (e.g., Docker, Kubernetes, Podman).
    Container,
}

/// Process-wide platform facts, resolved once and passed to the parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEnvironment {
    /// Operating system name as reported by [`std::env::consts::OS`].
    pub os: &'static str,
    /// Ticks per second of `/proc/stat` counters.
    pub user_hz: NonZeroU64,
    pub runtime: RuntimeEnvironment,
}

impl HostEnvironment {
    pub fn is_linux(&self) -> bool {
        self.os == "linux"
    }
}

/// Probes the operating system, USER_HZ and runtime environment.
///
/// # Errors
///
/// Returns an error if USER_HZ cannot be determined.
pub fn detect(rootfs: impl AsRef<Path>) -> Result<HostEnvironment> {
    let env = HostEnvironment {
        os: std::env::consts::OS,
        user_hz: query_user_hz()?,
        runtime: detect_runtime_environment(rootfs),
    };
    log::debug!(
        "Detected environment: os={}, user_hz={}, runtime={:?}",
        env.os,
        env.user_hz,
        env.runtime
    );
    Ok(env)
}

/// Detects whether the sensor runs in a container or on the host.
///
/// Checks `/proc/self/cgroup` for container runtime paths, then known marker files and
/// variables. Failures of individual checks are logged as warnings and treated as "no".
pub fn detect_runtime_environment(rootfs: impl AsRef<Path>) -> RuntimeEnvironment {
    let rootfs = rootfs.as_ref();
    match matches_container_cgroup(rootfs) {
        Ok(true) => return RuntimeEnvironment::Container,
        Ok(false) => {}
        Err(err) => log::warn!("Cgroup analysis failed during runtime detection: {}", err),
    }

    if has_container_indicators(rootfs) {
        return RuntimeEnvironment::Container;
    }

    RuntimeEnvironment::Host
}
