use std::path::PathBuf;

use crate::fsutil;

/// Errors that may occur while probing the host environment.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sysconf(_SC_CLK_TCK) returned unusable value {value}")]
    UserHz { value: libc::c_long },
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
