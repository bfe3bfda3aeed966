use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::buffer::BufferPool;
use crate::fsutil::PseudoFileReader;
use crate::stats::{PseudoFile, PseudoFs};

/// In-memory [`PseudoFileReader`] rooted at `/` that counts every read.
#[derive(Debug, Default)]
pub struct StubReader {
    files: Mutex<HashMap<PathBuf, String>>,
    errors: Mutex<HashMap<PathBuf, io::ErrorKind>>,
    calls: AtomicUsize,
}

pub fn stub_path(file: PseudoFile) -> PathBuf {
    Path::new("/").join(file.relative_path())
}

impl StubReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, file: PseudoFile, content: &str) -> Self {
        self.set_file(file, content);
        self
    }

    pub fn with_error(self, file: PseudoFile, kind: io::ErrorKind) -> Self {
        self.set_error(file, kind);
        self
    }

    pub fn set_file(&self, file: PseudoFile, content: &str) {
        self.errors.lock().unwrap().remove(&stub_path(file));
        self.files
            .lock()
            .unwrap()
            .insert(stub_path(file), content.to_string());
    }

    pub fn set_error(&self, file: PseudoFile, kind: io::ErrorKind) {
        self.errors.lock().unwrap().insert(stub_path(file), kind);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_fs(self) -> PseudoFs {
        fs_over(Arc::new(self))
    }

    fn content(&self, path: &Path) -> io::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.errors.lock().unwrap().get(path) {
            return Err(io::Error::from(*kind));
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

pub fn fs_over(reader: Arc<StubReader>) -> PseudoFs {
    PseudoFs::new(reader, "/", Arc::new(BufferPool::default()))
}

impl PseudoFileReader for StubReader {
    fn read_all(&self, path: &Path, buf: &mut String) -> io::Result<()> {
        buf.push_str(&self.content(path)?);
        Ok(())
    }

    fn read_first_line(&self, path: &Path, buf: &mut String) -> io::Result<()> {
        let content = self.content(path)?;
        buf.push_str(content.lines().next().unwrap_or(""));
        Ok(())
    }

    fn read_chars(&self, path: &Path, buf: &mut String, count: usize) -> io::Result<usize> {
        let content = self.content(path)?;
        let taken: String = content.chars().take(count).collect();
        buf.push_str(&taken);
        Ok(taken.len())
    }
}
