//! Defines structured error types for reading cgroup and procfs pseudo-files.
//!
//! # Error Types
//!
//! - [`SensorError::MalformedPseudoFile`] — content violates the fixed grammar of the file
//!   (wrong prefix, missing columns, trailing garbage, unknown TCP state, ...).
//! - [`SensorError::UnitConversion`] — an unrecognized memory unit suffix in `/proc/meminfo`.
//! - [`SensorError::Io`] — the underlying read failed; the original [`std::io::ErrorKind`] is kept.
//! - [`SensorError::UnsupportedPlatform`] — the host is not Linux.
//!
//! Malformed content always means the kernel ABI or the cgroup version differs from the
//! one this crate models, so these errors are never turned into default values.
//! Only [`SensorError::is_unavailable`] errors may be absorbed, and only by
//! [`crate::network::AvailabilityGuard`].

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("malformed pseudo-file `{path}`: {reason}")]
    MalformedPseudoFile { path: PathBuf, reason: String },

    #[error("unsupported memory unit '{unit}' in `{path}`")]
    UnitConversion { path: PathBuf, unit: String },

    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("resource sensing requires Linux, running on '{os}'")]
    UnsupportedPlatform { os: String },
}

pub type Result<T> = std::result::Result<T, SensorError>;

impl SensorError {
    pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        SensorError::MalformedPseudoFile {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        SensorError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for content that violates the expected grammar, unit errors included.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            SensorError::MalformedPseudoFile { .. } | SensorError::UnitConversion { .. }
        )
    }

    /// True when the file or its directory is missing or unreadable for permission reasons.
    pub fn is_unavailable(&self) -> bool {
        match self {
            SensorError::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::NotFound
                    | io::ErrorKind::NotADirectory
                    | io::ErrorKind::PermissionDenied
            ),
            _ => false,
        }
    }

    /// Path of the pseudo-file the error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            SensorError::MalformedPseudoFile { path, .. }
            | SensorError::UnitConversion { path, .. }
            | SensorError::Io { path, .. } => Some(path),
            SensorError::UnsupportedPlatform { .. } => None,
        }
    }
}
