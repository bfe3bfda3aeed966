//! Parsers turning cgroup v1 control files and procfs pseudo-files into resource readings.
//!
//! # Main types
//!
//! - [`CgroupCpuParser`]: CPU entitlement (CFS quota/period or cpuset size) and cgroup CPU time.
//! - [`CgroupMemoryParser`]: memory limit (or host total) and working-set usage.
//! - [`HostStatParser`]: host CPU time from `/proc/stat`.
//! - [`TcpStateParser`]: per-state socket counts from `/proc/net/tcp{,6}`.
//!
//! All parsers read through a [`PseudoFs`], which resolves the closed [`PseudoFile`]
//! table against a root directory and lends each read a pooled scratch buffer.
//! Integers are extracted with the allocation-free [`scanner`].
//!
//! # Error handling
//!
//! Content that does not match a file's grammar is always a [`SensorError`], never a
//! default value.

mod cpu;
mod error;
mod host;
mod memory;
pub mod scanner;
mod source;
mod tcp;

pub use cpu::CgroupCpuParser;
pub use error::{Result, SensorError};
pub use host::HostStatParser;
pub use memory::{CgroupMemoryParser, UNSET_MEMORY_LIMIT};
pub use source::{PseudoFile, PseudoFs};
pub use tcp::{AddressFamily, TcpConnectionSnapshot, TcpState, TcpStateParser};
