//! CPU entitlement and usage from the cgroup v1 `cpu`, `cpuset` and `cpuacct` controllers.
//!
//! # Parsing assumptions
//!
//! - `cpu.cfs_quota_us` and `cpu.cfs_period_us` hold a single integer on the first line,
//!   with `-1` (or an empty file) meaning no CFS bandwidth limit.
//! - `cpuset.cpus` holds a single `A-B` range. Lists such as `0-3,8-11` and single CPUs
//!   are rejected as malformed.
//! - `cpuacct.usage` holds the cumulative usage in nanoseconds.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use resource_sensor::buffer::BufferPool;
//! use resource_sensor::fsutil::FsReader;
//! use resource_sensor::stats::{CgroupCpuParser, PseudoFs};
//!
//! let fs = PseudoFs::new(Arc::new(FsReader), "/", Arc::new(BufferPool::default()));
//! let cpu = CgroupCpuParser::new(fs);
//! let cores = cpu.limited_cpu_count()?;
//! # Ok::<(), resource_sensor::stats::SensorError>(())
//! ```

use super::scanner::{is_exhausted, is_unset, next_number};
use super::source::{PseudoFile, PseudoFs};
use super::{Result, SensorError};

/// Characters read from single-integer files; `u64::MAX` has 20 digits.
pub(crate) const NUMBER_FILE_CHARS: usize = 32;

#[derive(Debug, Clone)]
pub struct CgroupCpuParser {
    fs: PseudoFs,
}

impl CgroupCpuParser {
    pub fn new(fs: PseudoFs) -> Self {
        Self { fs }
    }

    /// Cumulative CPU time consumed by the cgroup, in nanoseconds.
    pub fn cgroup_cpu_usage_nanoseconds(&self) -> Result<u64> {
        let file = PseudoFile::CpuacctUsage;
        let buf = self.fs.read_chars(file, NUMBER_FILE_CHARS)?;
        let scanned = next_number(&buf, 0)
            .filter(|scanned| is_exhausted(&buf, scanned.next))
            .ok_or_else(|| {
                SensorError::malformed(
                    &self.fs.path(file),
                    format!("expected a single integer, got '{}'", buf.as_str()),
                )
            })?;
        Ok(scanned.value)
    }

    /// CPU cores the cgroup may use, as `quota / period`, or the host core count when
    /// no CFS quota is set.
    ///
    /// The result is fractional: a quota of `150000` over a period of `100000` is `1.5`.
    pub fn limited_cpu_count(&self) -> Result<f64> {
        let Some(quota) = self.read_cfs_value(PseudoFile::CpuQuota)? else {
            return self.host_cpu_count().map(|count| count as f64);
        };
        let Some(period) = self.read_cfs_value(PseudoFile::CpuPeriod)? else {
            return self.host_cpu_count().map(|count| count as f64);
        };
        if period == 0 {
            return Err(SensorError::malformed(
                &self.fs.path(PseudoFile::CpuPeriod),
                "CFS period is zero",
            ));
        }

        Ok(quota as f64 / period as f64)
    }

    /// Number of CPUs in the `cpuset.cpus` range `A-B`, i.e. `B - A + 1`.
    pub fn host_cpu_count(&self) -> Result<u64> {
        let file = PseudoFile::CpusetCpus;
        let line = self.fs.read_first_line(file)?;
        parse_cpu_range(&line)
            .map_err(|reason| SensorError::malformed(&self.fs.path(file), reason))
    }

    /// Reads a CFS control file. `None` means "no limit".
    fn read_cfs_value(&self, file: PseudoFile) -> Result<Option<u64>> {
        let line = self.fs.read_first_line(file)?;
        if is_unset(&line) {
            return Ok(None);
        }

        let scanned = next_number(&line, 0).ok_or_else(|| {
            SensorError::malformed(
                &self.fs.path(file),
                format!("expected an integer, got '{}'", line.as_str()),
            )
        })?;
        if !is_exhausted(&line, scanned.next) {
            return Err(SensorError::malformed(
                &self.fs.path(file),
                format!("unexpected content after integer in '{}'", line.as_str()),
            ));
        }

        Ok(Some(scanned.value))
    }
}

fn parse_cpu_range(line: &str) -> std::result::Result<u64, String> {
    let dash = line
        .find('-')
        .ok_or_else(|| format!("expected a range 'A-B', got '{line}'"))?;
    if dash == 0 {
        return Err(format!("missing range start in '{line}'"));
    }

    let start = next_number(line, 0)
        .filter(|scanned| scanned.next == Some(dash))
        .ok_or_else(|| format!("invalid range start in '{line}'"))?;
    let end = next_number(line, dash + 1)
        .ok_or_else(|| format!("missing range end in '{line}'"))?;
    if !is_exhausted(line, end.next) {
        return Err(format!("unexpected content after range in '{line}'"));
    }
    if end.value < start.value {
        return Err(format!("range end precedes start in '{line}'"));
    }

    Ok(end.value - start.value + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubReader;

    fn parser(reader: StubReader) -> CgroupCpuParser {
        CgroupCpuParser::new(reader.into_fs())
    }

    fn with_cpuset(range: &str) -> StubReader {
        StubReader::new().with_file(PseudoFile::CpusetCpus, range)
    }

    #[test]
    fn test_host_cpu_count_range() {
        for (a, b) in [(0u64, 0u64), (0, 7), (2, 5), (16, 31)] {
            let cpu = parser(with_cpuset(&format!("{a}-{b}\n")));
            assert_eq!(cpu.host_cpu_count().unwrap(), b - a + 1);
        }
    }

    #[test]
    fn test_host_cpu_count_rejects_bad_ranges() {
        for content in ["7", "-7", "7-3", "0-3,8-11", "a-3", "0-", "0 -3x"] {
            let cpu = parser(with_cpuset(content));
            let err = cpu.host_cpu_count().unwrap_err();
            match err {
                SensorError::MalformedPseudoFile { path, .. } => {
                    assert!(path.ends_with("cpuset.cpus"), "{content}");
                }
                other => panic!("Expected MalformedPseudoFile for '{content}', got {other:?}"),
            }
        }
    }

    #[test]
    fn test_limited_cpu_count_fraction() {
        let cpu = parser(
            with_cpuset("0-7")
                .with_file(PseudoFile::CpuQuota, "150000\n")
                .with_file(PseudoFile::CpuPeriod, "100000\n"),
        );
        assert_eq!(cpu.limited_cpu_count().unwrap(), 1.5);
    }

    #[test]
    fn test_limited_cpu_count_unset_quota_uses_host() {
        for period in ["100000", "garbage", ""] {
            let cpu = parser(
                with_cpuset("0-3")
                    .with_file(PseudoFile::CpuQuota, "-1\n")
                    .with_file(PseudoFile::CpuPeriod, period),
            );
            assert_eq!(cpu.limited_cpu_count().unwrap(), 4.0);
        }
    }

    #[test]
    fn test_limited_cpu_count_empty_quota_uses_host() {
        let cpu = parser(with_cpuset("0-1").with_file(PseudoFile::CpuQuota, ""));
        assert_eq!(cpu.limited_cpu_count().unwrap(), 2.0);
    }

    #[test]
    fn test_limited_cpu_count_unset_period_uses_host() {
        let cpu = parser(
            with_cpuset("0-5")
                .with_file(PseudoFile::CpuQuota, "50000")
                .with_file(PseudoFile::CpuPeriod, "-1"),
        );
        assert_eq!(cpu.limited_cpu_count().unwrap(), 6.0);
    }

    #[test]
    fn test_limited_cpu_count_trailing_content() {
        let cpu = parser(
            with_cpuset("0-5")
                .with_file(PseudoFile::CpuQuota, "50000 max")
                .with_file(PseudoFile::CpuPeriod, "100000"),
        );
        let err = cpu.limited_cpu_count().unwrap_err();
        assert!(err.is_malformed());
        assert!(err.path().unwrap().ends_with("cpu.cfs_quota_us"));
    }

    #[test]
    fn test_limited_cpu_count_zero_period() {
        let cpu = parser(
            with_cpuset("0-5")
                .with_file(PseudoFile::CpuQuota, "50000")
                .with_file(PseudoFile::CpuPeriod, "0"),
        );
        assert!(cpu.limited_cpu_count().unwrap_err().is_malformed());
    }

    #[test]
    fn test_limited_cpu_count_missing_period_file() {
        let cpu = parser(with_cpuset("0-5").with_file(PseudoFile::CpuQuota, "50000"));
        let err = cpu.limited_cpu_count().unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_cgroup_cpu_usage() {
        let cpu = parser(
            StubReader::new().with_file(PseudoFile::CpuacctUsage, "623932088000\n"),
        );
        assert_eq!(cpu.cgroup_cpu_usage_nanoseconds().unwrap(), 623_932_088_000);
    }

    #[test]
    fn test_cgroup_cpu_usage_empty() {
        let cpu = parser(StubReader::new().with_file(PseudoFile::CpuacctUsage, ""));
        assert!(cpu.cgroup_cpu_usage_nanoseconds().unwrap_err().is_malformed());
    }

    #[test]
    fn test_cgroup_cpu_usage_trailing_content() {
        let cpu = parser(
            StubReader::new().with_file(PseudoFile::CpuacctUsage, "623932088000ns\n"),
        );
        assert!(cpu.cgroup_cpu_usage_nanoseconds().unwrap_err().is_malformed());
    }
}
