//! The closed table of pseudo-files this crate reads, and [`PseudoFs`], which reads
//! them into pooled buffers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::buffer::{BufferPool, PooledBuffer};
use crate::fsutil::PseudoFileReader;

use super::{Result, SensorError};

/// Every pseudo-file the parsers understand. Paths are relative to the filesystem root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoFile {
    /// `cpu.cfs_quota_us`: one integer, or `-1` when unset.
    CpuQuota,
    /// `cpu.cfs_period_us`: one integer.
    CpuPeriod,
    /// `cpuset.cpus`: an `A-B` range.
    CpusetCpus,
    /// `cpuacct.usage`: cumulative CPU time in nanoseconds.
    CpuacctUsage,
    /// `memory.limit_in_bytes`: one integer, a huge sentinel when unset.
    MemoryLimit,
    /// `memory.usage_in_bytes`: one integer.
    MemoryUsage,
    /// `memory.stat`: `<key> <value>` lines.
    MemoryStat,
    /// `/proc/stat`.
    ProcStat,
    /// `/proc/meminfo`.
    ProcMeminfo,
    /// `/proc/net/tcp`.
    ProcNetTcp,
    /// `/proc/net/tcp6`.
    ProcNetTcp6,
}

impl PseudoFile {
    pub const ALL: [PseudoFile; 11] = [
        PseudoFile::CpuQuota,
        PseudoFile::CpuPeriod,
        PseudoFile::CpusetCpus,
        PseudoFile::CpuacctUsage,
        PseudoFile::MemoryLimit,
        PseudoFile::MemoryUsage,
        PseudoFile::MemoryStat,
        PseudoFile::ProcStat,
        PseudoFile::ProcMeminfo,
        PseudoFile::ProcNetTcp,
        PseudoFile::ProcNetTcp6,
    ];

    pub const fn relative_path(self) -> &'static str {
        match self {
            PseudoFile::CpuQuota => "sys/fs/cgroup/cpu/cpu.cfs_quota_us",
            PseudoFile::CpuPeriod => "sys/fs/cgroup/cpu/cpu.cfs_period_us",
            PseudoFile::CpusetCpus => "sys/fs/cgroup/cpuset/cpuset.cpus",
            PseudoFile::CpuacctUsage => "sys/fs/cgroup/cpuacct/cpuacct.usage",
            PseudoFile::MemoryLimit => "sys/fs/cgroup/memory/memory.limit_in_bytes",
            PseudoFile::MemoryUsage => "sys/fs/cgroup/memory/memory.usage_in_bytes",
            PseudoFile::MemoryStat => "sys/fs/cgroup/memory/memory.stat",
            PseudoFile::ProcStat => "proc/stat",
            PseudoFile::ProcMeminfo => "proc/meminfo",
            PseudoFile::ProcNetTcp => "proc/net/tcp",
            PseudoFile::ProcNetTcp6 => "proc/net/tcp6",
        }
    }
}

/// Binds a [`PseudoFileReader`] to a filesystem root and a [`BufferPool`].
///
/// Every read returns a pooled buffer holding the content; read failures come back
/// as [`SensorError::Io`] naming the full path.
#[derive(Clone)]
pub struct PseudoFs {
    reader: Arc<dyn PseudoFileReader>,
    root: PathBuf,
    pool: Arc<BufferPool>,
}

impl std::fmt::Debug for PseudoFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PseudoFs")
            .field("root", &self.root)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl PseudoFs {
    pub fn new(
        reader: Arc<dyn PseudoFileReader>,
        root: impl Into<PathBuf>,
        pool: Arc<BufferPool>,
    ) -> Self {
        Self {
            reader,
            root: root.into(),
            pool,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `file` under this root.
    pub fn path(&self, file: PseudoFile) -> PathBuf {
        self.root.join(file.relative_path())
    }

    pub fn read_all(&self, file: PseudoFile) -> Result<PooledBuffer<'_>> {
        let path = self.path(file);
        let mut buf = self.pool.acquire();
        self.reader
            .read_all(&path, &mut buf)
            .map_err(|source| SensorError::io(&path, source))?;
        Ok(buf)
    }

    pub fn read_first_line(&self, file: PseudoFile) -> Result<PooledBuffer<'_>> {
        let path = self.path(file);
        let mut buf = self.pool.acquire();
        self.reader
            .read_first_line(&path, &mut buf)
            .map_err(|source| SensorError::io(&path, source))?;
        Ok(buf)
    }

    pub fn read_chars(&self, file: PseudoFile, count: usize) -> Result<PooledBuffer<'_>> {
        let path = self.path(file);
        let mut buf = self.pool.acquire();
        self.reader
            .read_chars(&path, &mut buf, count)
            .map_err(|source| SensorError::io(&path, source))?;
        Ok(buf)
    }
}
