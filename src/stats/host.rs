//! Host-wide CPU time from `/proc/stat` and host memory from `/proc/meminfo`.
//!
//! The aggregate `cpu ` line of `/proc/stat` reports time in USER_HZ ticks:
//!
//! ```text
//! cpu  user nice system idle iowait irq softirq steal guest guest_nice
//! ```
//!
//! The first eight columns are summed; `guest` and `guest_nice` are already
//! included in `user` and `nice`.

use std::num::NonZeroU64;

use super::memory::CgroupMemoryParser;
use super::scanner::{ends_token, next_number};
use super::source::{PseudoFile, PseudoFs};
use super::{Result, SensorError};

const CPU_LINE_PREFIX: &str = "cpu ";
const CPU_TIME_COLUMNS: usize = 8;
const NANOS_PER_SECOND: u128 = 1_000_000_000;

#[derive(Debug, Clone)]
pub struct HostStatParser {
    fs: PseudoFs,
    user_hz: NonZeroU64,
}

impl HostStatParser {
    /// Creates a parser converting ticks with the given USER_HZ.
    pub fn new(fs: PseudoFs, user_hz: NonZeroU64) -> Self {
        Self { fs, user_hz }
    }

    /// CPU time consumed by all cores since boot, in nanoseconds.
    pub fn host_cpu_usage_nanoseconds(&self) -> Result<u64> {
        let file = PseudoFile::ProcStat;
        let line = self.fs.read_first_line(file)?;
        if !line.starts_with(CPU_LINE_PREFIX) {
            return Err(SensorError::malformed(
                &self.fs.path(file),
                format!("expected the aggregate '{}' line", CPU_LINE_PREFIX.trim_end()),
            ));
        }

        let mut ticks: u64 = 0;
        let mut offset = Some(CPU_LINE_PREFIX.len());
        for column in 0..CPU_TIME_COLUMNS {
            let scanned = offset.and_then(|start| next_number(&line, start)).ok_or_else(|| {
                SensorError::malformed(
                    &self.fs.path(file),
                    format!("expected {CPU_TIME_COLUMNS} CPU time columns, found {column}"),
                )
            })?;
            if !ends_token(&line, scanned.next) {
                return Err(SensorError::malformed(
                    &self.fs.path(file),
                    format!("unexpected content after CPU time column {column}"),
                ));
            }
            ticks = ticks.checked_add(scanned.value).ok_or_else(|| {
                SensorError::malformed(&self.fs.path(file), "CPU tick sum overflows 64 bits")
            })?;
            offset = scanned.next;
        }

        let nanos = u128::from(ticks) * NANOS_PER_SECOND / u128::from(self.user_hz.get());
        u64::try_from(nanos).map_err(|_| {
            SensorError::malformed(&self.fs.path(file), "CPU time overflows 64 bits")
        })
    }

    /// Host memory in bytes. Same reading as [`CgroupMemoryParser::host_available_memory`].
    pub fn host_available_memory(&self) -> Result<u64> {
        CgroupMemoryParser::new(self.fs.clone()).host_available_memory()
    }
}
