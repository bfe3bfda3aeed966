//! Memory limit and working-set usage from the cgroup v1 `memory` controller, with
//! `/proc/meminfo` as the fallback when no limit is set.
//!
//! # Parsing assumptions
//!
//! - `memory.limit_in_bytes` and `memory.usage_in_bytes` hold one integer. An unset
//!   limit is reported by the kernel as [`UNSET_MEMORY_LIMIT`].
//! - `memory.stat` holds `<key> <value>` lines and must contain `total_inactive_file`.
//! - The first line of `/proc/meminfo` is `MemTotal:` followed by an integer and a
//!   two-letter unit (`kB`, `MB`, `GB` or `TB`).
//!
//! # Working set
//!
//! Usage is reported as `memory.usage_in_bytes - total_inactive_file`, the same
//! working-set figure container runtimes report. A negative difference means the two
//! files disagree and is reported as malformed content rather than clamped.

use super::cpu::NUMBER_FILE_CHARS;
use super::scanner::{is_exhausted, next_number, remainder};
use super::source::{PseudoFile, PseudoFs};
use super::{Result, SensorError};

/// `memory.limit_in_bytes` of an unlimited cgroup: `i64::MAX` rounded down to a 4 KiB page.
pub const UNSET_MEMORY_LIMIT: u64 = 0x7FFF_FFFF_FFFF_F000;

const MEMINFO_TOTAL_PREFIX: &str = "MemTotal:";
const INACTIVE_FILE_KEY: &str = "total_inactive_file";

#[derive(Debug, Clone)]
pub struct CgroupMemoryParser {
    fs: PseudoFs,
}

impl CgroupMemoryParser {
    pub fn new(fs: PseudoFs) -> Self {
        Self { fs }
    }

    /// Memory available to the cgroup in bytes: its limit, or the host total when unset.
    pub fn available_memory(&self) -> Result<u64> {
        let limit = self.read_single_number(PseudoFile::MemoryLimit)?;
        if limit == UNSET_MEMORY_LIMIT {
            return self.host_available_memory();
        }

        Ok(limit)
    }

    /// Host memory in bytes, from the `MemTotal:` line of `/proc/meminfo`.
    pub fn host_available_memory(&self) -> Result<u64> {
        let file = PseudoFile::ProcMeminfo;
        let line = self.fs.read_first_line(file)?;
        let path = || self.fs.path(file);

        if !line.starts_with(MEMINFO_TOTAL_PREFIX) {
            return Err(SensorError::malformed(
                &path(),
                format!("expected prefix '{MEMINFO_TOTAL_PREFIX}', got '{}'", line.as_str()),
            ));
        }

        let scanned = next_number(&line, MEMINFO_TOTAL_PREFIX.len()).ok_or_else(|| {
            SensorError::malformed(&path(), format!("missing total in '{}'", line.as_str()))
        })?;
        let unit = remainder(&line, scanned.next).trim();
        if unit.is_empty() {
            return Err(SensorError::malformed(
                &path(),
                format!("missing unit in '{}'", line.as_str()),
            ));
        }
        if unit.len() != 2 {
            return Err(SensorError::malformed(
                &path(),
                format!("unexpected content after total in '{}'", line.as_str()),
            ));
        }

        let shift = unit_shift(unit).ok_or_else(|| SensorError::UnitConversion {
            path: path(),
            unit: unit.to_string(),
        })?;

        scanned.value.checked_mul(1 << shift).ok_or_else(|| {
            SensorError::malformed(&path(), format!("total overflows in '{}'", line.as_str()))
        })
    }

    /// Working-set bytes: `memory.usage_in_bytes` minus `total_inactive_file`.
    pub fn memory_usage(&self) -> Result<u64> {
        let inactive = self.read_inactive_file()?;
        let usage = self.read_single_number(PseudoFile::MemoryUsage)?;

        usage.checked_sub(inactive).ok_or_else(|| {
            SensorError::malformed(
                &self.fs.path(PseudoFile::MemoryUsage),
                format!("usage {usage} is below {INACTIVE_FILE_KEY} {inactive}"),
            )
        })
    }

    fn read_inactive_file(&self) -> Result<u64> {
        let file = PseudoFile::MemoryStat;
        let buf = self.fs.read_all(file)?;

        let mut offset = 0;
        for line in buf.split_inclusive('\n') {
            let is_key = line
                .strip_prefix(INACTIVE_FILE_KEY)
                .is_some_and(|rest| rest.starts_with([' ', '\t']));
            if is_key {
                let start = offset + INACTIVE_FILE_KEY.len();
                return next_number(&buf, start).map(|s| s.value).ok_or_else(|| {
                    SensorError::malformed(
                        &self.fs.path(file),
                        format!("missing value for '{INACTIVE_FILE_KEY}'"),
                    )
                });
            }
            offset += line.len();
        }

        Err(SensorError::malformed(
            &self.fs.path(file),
            format!("missing key '{INACTIVE_FILE_KEY}'"),
        ))
    }

    fn read_single_number(&self, file: PseudoFile) -> Result<u64> {
        let buf = self.fs.read_chars(file, NUMBER_FILE_CHARS)?;
        next_number(&buf, 0)
            .filter(|s| is_exhausted(&buf, s.next))
            .map(|s| s.value)
            .ok_or_else(|| {
                SensorError::malformed(
                    &self.fs.path(file),
                    format!("expected a single integer, got '{}'", buf.as_str()),
                )
            })
    }
}

fn unit_shift(unit: &str) -> Option<u32> {
    match unit {
        "kB" => Some(10),
        "MB" => Some(20),
        "GB" => Some(30),
        "TB" => Some(40),
        _ => None,
    }
}
