//! Reusable scratch buffers for pseudo-file parsing.
//!
//! Each parse borrows one [`String`] from a [`BufferPool`] and gives it back when
//! the [`PooledBuffer`] guard is dropped, on success and error paths alike.
//! A buffer is owned by exactly one guard at a time, so concurrent parses never
//! share storage.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

const DEFAULT_CAPACITY: usize = 512;
const DEFAULT_MAX_RETAINED: usize = 8;

/// A pool of growable character buffers.
#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<String>>,
    initial_capacity: usize,
    max_retained: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_MAX_RETAINED)
    }
}

impl BufferPool {
    /// Creates a pool handing out buffers of `initial_capacity` bytes and keeping
    /// at most `max_retained` idle buffers around.
    pub fn new(initial_capacity: usize, max_retained: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::with_capacity(max_retained)),
            initial_capacity,
            max_retained,
        }
    }

    /// Takes an empty buffer out of the pool, allocating one if none is idle.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| String::with_capacity(self.initial_capacity));
        PooledBuffer {
            pool: self,
            buf: Some(buf),
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release(&self, mut buf: String) {
        buf.clear();
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        if buffers.len() < self.max_retained {
            buffers.push(buf);
        }
    }
}

/// Scoped handle to a pooled buffer. Dereferences to [`String`].
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Option<String>,
}

impl Deref for PooledBuffer<'_> {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        // only `drop` takes the buffer out
        self.buf.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_returns_empty_buffer() {
        let pool = BufferPool::default();
        {
            let mut buf = pool.acquire();
            buf.push_str("MemTotal: 1 kB");
        }
        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= "MemTotal: 1 kB".len());
    }

    #[test]
    fn test_buffer_returned_on_error_path() {
        fn failing(pool: &BufferPool) -> Result<(), ()> {
            let mut buf = pool.acquire();
            buf.push_str("garbage");
            Err(())
        }

        let pool = BufferPool::default();
        assert_eq!(pool.idle(), 0);
        assert!(failing(&pool).is_err());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_concurrent_guards_do_not_share() {
        let pool = BufferPool::default();
        let mut a = pool.acquire();
        let mut b = pool.acquire();
        a.push_str("a");
        b.push_str("b");
        assert_eq!(a.as_str(), "a");
        assert_eq!(b.as_str(), "b");
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_retention_is_bounded() {
        let pool = BufferPool::new(16, 1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
    }
}
