//! Filesystem access behind the [`PseudoFileReader`] capability.
//!
//! Parsers never touch `std::fs` directly. They go through a reader that fills a
//! caller-owned buffer, so production code can use [`FsReader`] and tests can swap
//! in an in-memory implementation.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl From<FileOpenError> for io::Error {
    fn from(err: FileOpenError) -> Self {
        io::Error::new(err.source.kind(), err)
    }
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use resource_sensor::fsutil;
/// let reader = fsutil::open_file_reader("/proc/stat")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads pseudo-files into a caller-owned buffer.
///
/// Implementations append to `buf`; callers hand in a cleared buffer.
/// The `io::ErrorKind` of a failure must be preserved, since callers decide
/// between a hard failure and a soft one based on it.
pub trait PseudoFileReader: Send + Sync {
    /// Reads the whole file.
    fn read_all(&self, path: &Path, buf: &mut String) -> io::Result<()>;

    /// Reads the first line, without its line terminator.
    fn read_first_line(&self, path: &Path, buf: &mut String) -> io::Result<()>;

    /// Reads at most `count` characters and returns how many were read.
    fn read_chars(&self, path: &Path, buf: &mut String, count: usize) -> io::Result<usize>;
}

/// [`PseudoFileReader`] backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl PseudoFileReader for FsReader {
    fn read_all(&self, path: &Path, buf: &mut String) -> io::Result<()> {
        let mut reader = open_file_reader(path)?;
        reader.read_to_string(buf)?;
        Ok(())
    }

    fn read_first_line(&self, path: &Path, buf: &mut String) -> io::Result<()> {
        let mut reader = open_file_reader(path)?;
        reader.read_line(buf)?;
        let trimmed = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(trimmed);
        Ok(())
    }

    fn read_chars(&self, path: &Path, buf: &mut String, count: usize) -> io::Result<usize> {
        let reader = open_file_reader(path)?;
        // pseudo-files are ASCII, so bytes and characters coincide
        let mut bytes = Vec::with_capacity(count);
        reader.take(count as u64).read_to_end(&mut bytes)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        buf.push_str(text);
        Ok(text.len())
    }
}
