//! The accessor surface a metrics layer polls: resource entitlements, utilization ratios,
//! a point-in-time CPU/memory snapshot and TCP connection counts.
//!
//! Utilization is derived from successive readings. CPU utilization compares the
//! cgroup's CPU-time delta with the host's, scaled from "share of the host" to "share of
//! the cgroup's entitlement". Both ratios are clamped to `[0, 1]` and recomputed at most
//! once per refresh interval; in between, the last value is served without touching
//! the filesystem.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::buffer::BufferPool;
use crate::clock::Clock;
use crate::config::SensorOptions;
use crate::environment::HostEnvironment;
use crate::fsutil::PseudoFileReader;
use crate::network::TcpConnectionMonitor;
use crate::stats::{
    AddressFamily, CgroupCpuParser, CgroupMemoryParser, HostStatParser, PseudoFs, Result,
    SensorError, TcpConnectionSnapshot, TcpState, TcpStateParser,
};

/// Resources the cgroup is entitled to, computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemResources {
    /// CPU cores the cgroup can always use (may be fractional).
    pub guaranteed_cpu_units: f64,
    /// CPU cores the cgroup may use at most (may be fractional).
    pub maximum_cpu_units: f64,
    /// Memory in bytes the cgroup can always use.
    pub guaranteed_memory_bytes: u64,
    /// Memory in bytes the cgroup may use at most.
    pub maximum_memory_bytes: u64,
}

/// CPU times and memory usage at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceSnapshot {
    /// Clock reading at the time of the snapshot.
    pub total_time: Duration,
    /// Always zero; cgroup v1 `cpuacct.usage` does not split kernel time.
    pub kernel_time: Duration,
    /// Cumulative CPU time of the cgroup.
    pub user_time: Duration,
    /// Working set in bytes.
    pub memory_usage_bytes: u64,
}

/// Everything one collection pass reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReadings {
    pub resources: SystemResources,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
    pub snapshot: ResourceSnapshot,
    pub tcp_ipv4: TcpConnectionSnapshot,
    pub tcp_ipv6: TcpConnectionSnapshot,
}

#[derive(Debug)]
struct CpuState {
    refresh_after: Duration,
    cgroup_nanos: u64,
    host_nanos: u64,
    utilization: f64,
}

#[derive(Debug)]
struct MemoryState {
    refresh_after: Duration,
    utilization: f64,
}

pub struct ResourceSensor {
    cpu: CgroupCpuParser,
    memory: CgroupMemoryParser,
    host: HostStatParser,
    tcp: TcpConnectionMonitor,
    clock: Arc<dyn Clock>,
    resources: SystemResources,
    scale: f64,
    cpu_refresh_interval: Duration,
    memory_refresh_interval: Duration,
    cpu_state: Mutex<CpuState>,
    memory_state: Mutex<MemoryState>,
}

impl std::fmt::Debug for ResourceSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceSensor")
            .field("resources", &self.resources)
            .field("scale", &self.scale)
            .field("cpu_state", &self.cpu_state)
            .field("memory_state", &self.memory_state)
            .field("tcp", &self.tcp)
            .finish_non_exhaustive()
    }
}

impl ResourceSensor {
    /// Builds a sensor reading through `reader` below `options.root`.
    ///
    /// Reads the CPU and memory entitlements and takes the first CPU-time baseline.
    ///
    /// # Errors
    ///
    /// * [`SensorError::UnsupportedPlatform`] if `env` is not Linux.
    /// * Any error from the initial reads.
    pub fn new(
        options: &SensorOptions,
        env: &HostEnvironment,
        reader: Arc<dyn PseudoFileReader>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if !env.is_linux() {
            return Err(SensorError::UnsupportedPlatform {
                os: env.os.to_string(),
            });
        }

        let fs = PseudoFs::new(reader, &options.root, Arc::new(BufferPool::default()));
        let cpu = CgroupCpuParser::new(fs.clone());
        let memory = CgroupMemoryParser::new(fs.clone());
        let host = HostStatParser::new(fs.clone(), env.user_hz);

        let limited_cpus = cpu.limited_cpu_count()?;
        let host_cpus = cpu.host_cpu_count()? as f64;
        let available_memory = memory.available_memory()?;
        let resources = SystemResources {
            guaranteed_cpu_units: limited_cpus,
            maximum_cpu_units: limited_cpus,
            guaranteed_memory_bytes: available_memory,
            maximum_memory_bytes: available_memory,
        };
        let scale = if limited_cpus > 0.0 {
            host_cpus / limited_cpus
        } else {
            1.0
        };

        let now = clock.now();
        let cpu_state = CpuState {
            refresh_after: now + options.cpu_refresh_interval,
            cgroup_nanos: cpu.cgroup_cpu_usage_nanoseconds()?,
            host_nanos: host.host_cpu_usage_nanoseconds()?,
            utilization: 0.0,
        };
        log::info!(
            "Sensing {} of {} host CPUs and {} bytes of memory under `{}`",
            limited_cpus,
            host_cpus,
            available_memory,
            fs.root().display()
        );

        Ok(Self {
            tcp: TcpConnectionMonitor::new(
                TcpStateParser::new(fs),
                Arc::clone(&clock),
                options.sampling_interval,
                options.retry_interval,
            ),
            cpu,
            memory,
            host,
            clock,
            resources,
            scale,
            cpu_refresh_interval: options.cpu_refresh_interval,
            memory_refresh_interval: options.memory_refresh_interval,
            cpu_state: Mutex::new(cpu_state),
            memory_state: Mutex::new(MemoryState {
                refresh_after: Duration::ZERO,
                utilization: 0.0,
            }),
        })
    }

    pub fn resources(&self) -> SystemResources {
        self.resources
    }

    /// Share of the cgroup's CPU entitlement used since the previous refresh.
    ///
    /// If either CPU-time counter has not advanced, the previous value and baseline are
    /// kept and the next call reads again.
    pub fn cpu_utilization(&self) -> Result<f64> {
        let mut state = self.cpu_state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        if now < state.refresh_after {
            return Ok(state.utilization);
        }

        let cgroup_nanos = self.cpu.cgroup_cpu_usage_nanoseconds()?;
        let host_nanos = self.host.host_cpu_usage_nanoseconds()?;
        let cgroup_delta = cgroup_nanos.saturating_sub(state.cgroup_nanos);
        let host_delta = host_nanos.saturating_sub(state.host_nanos);
        if cgroup_delta == 0 || host_delta == 0 {
            log::trace!(
                "CPU counters did not advance (cgroup +{cgroup_delta}ns, host +{host_delta}ns)"
            );
            return Ok(state.utilization);
        }

        let utilization = (cgroup_delta as f64 / host_delta as f64 * self.scale).min(1.0);
        *state = CpuState {
            refresh_after: now + self.cpu_refresh_interval,
            cgroup_nanos,
            host_nanos,
            utilization,
        };
        log::trace!("CPU utilization refreshed: {utilization:.4}");

        Ok(utilization)
    }

    /// Working set as a share of the available memory.
    pub fn memory_utilization(&self) -> Result<f64> {
        let mut state = self
            .memory_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        if now < state.refresh_after {
            return Ok(state.utilization);
        }

        let usage = self.memory.memory_usage()?;
        let available = self.resources.maximum_memory_bytes;
        let utilization = if available == 0 {
            0.0
        } else {
            (usage as f64 / available as f64).min(1.0)
        };
        *state = MemoryState {
            refresh_after: now + self.memory_refresh_interval,
            utilization,
        };
        log::trace!("Memory utilization refreshed: {utilization:.4}");

        Ok(utilization)
    }

    /// Reads CPU time and memory usage now. All CPU time is reported as user time.
    pub fn snapshot(&self) -> Result<ResourceSnapshot> {
        let total_time = self.clock.now();
        let user_time = Duration::from_nanos(self.cpu.cgroup_cpu_usage_nanoseconds()?);
        let memory_usage_bytes = self.memory.memory_usage()?;

        Ok(ResourceSnapshot {
            total_time,
            kernel_time: Duration::ZERO,
            user_time,
            memory_usage_bytes,
        })
    }

    pub fn tcp_connections(&self, family: AddressFamily) -> Result<TcpConnectionSnapshot> {
        self.tcp.snapshot(family)
    }

    pub fn tcp_connection_count(&self, family: AddressFamily, state: TcpState) -> Result<u64> {
        self.tcp.connection_count(family, state)
    }

    /// Runs every accessor once.
    pub fn collect(&self) -> Result<SensorReadings> {
        Ok(SensorReadings {
            resources: self.resources(),
            cpu_utilization: self.cpu_utilization()?,
            memory_utilization: self.memory_utilization()?,
            snapshot: self.snapshot()?,
            tcp_ipv4: self.tcp_connections(AddressFamily::Ipv4)?,
            tcp_ipv6: self.tcp_connections(AddressFamily::Ipv6)?,
        })
    }
}
