//! Immutable, reference-counted byte buffers and zero-copy sub-views into them.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use crate::errors::*;

/// An immutable view `[offset, offset + len)` into a shared byte block. Sub-views keep the parent
/// block alive through the shared owner, bytes are never duplicated.
#[derive(Clone)]
pub struct Buffer {
    owner: Arc<Vec<u8>>,
    offset: usize,
    len: usize,
}

impl Buffer {
    /// Creates a buffer that owns the whole `bytes`. The vector is moved, not copied.
    pub fn new<T: Into<Vec<u8>>>(bytes: T) -> Self {
        let owner = Arc::new(bytes.into());
        let len = owner.len();
        Buffer {
            owner,
            offset: 0,
            len,
        }
    }

    /// Creates a zero-copy view of `len` bytes starting at `offset` (relative to this view).
    pub fn slice(&self, offset: u64, len: u64) -> Result<Buffer> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| Error::Corrupt(format!("range {}+{} overflows.", offset, len)))?;

        if end > self.len as u64 {
            return Err(Error::Corrupt(format!(
                "range [{}, {}) lies outside of a buffer with {} bytes.",
                offset, end, self.len
            )));
        }

        Ok(Buffer {
            owner: self.owner.clone(),
            offset: self.offset + offset as usize,
            len: len as usize,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if both views share the same underlying block.
    #[inline]
    pub fn shares_owner(&self, rhs: &Buffer) -> bool {
        Arc::ptr_eq(&self.owner, &rhs.owner)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.owner[self.offset..self.offset + self.len]
    }

    #[inline]
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}

impl Deref for Buffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Buffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Buffer::new(bytes)
    }
}

impl PartialEq for Buffer {
    fn eq(&self, rhs: &Buffer) -> bool {
        self.as_slice() == rhs.as_slice()
    }
}

impl Eq for Buffer {}

impl PartialEq<[u8]> for Buffer {
    fn eq(&self, rhs: &[u8]) -> bool {
        self.as_slice() == rhs
    }
}

impl<'a> PartialEq<&'a [u8]> for Buffer {
    fn eq(&self, rhs: &&'a [u8]) -> bool {
        self.as_slice() == *rhs
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

/// A pool of scratch byte vectors. Vectors are cleared when they come back, their capacity is
/// kept for the next borrower.
#[derive(Default)]
pub struct BufferPool {
    bufs: Mutex<Vec<Vec<u8>>>,
    max: usize,
}

impl BufferPool {
    /// Creates a pool that retains at most `max` idle vectors.
    pub fn new(max: usize) -> Self {
        BufferPool {
            bufs: Mutex::new(Vec::new()),
            max,
        }
    }

    /// Takes an empty vector out of the pool, or allocates a new one.
    pub fn take(&self) -> Vec<u8> {
        self.bufs.lock().unwrap().pop().unwrap_or_default()
    }

    /// Returns a vector to the pool.
    pub fn recycle(&self, mut buf: Vec<u8>) {
        buf.clear();

        let mut bufs = self.bufs.lock().unwrap();
        if bufs.len() < self.max {
            bufs.push(buf);
        }
    }

    /// The number of idle vectors.
    pub fn idle(&self) -> usize {
        self.bufs.lock().unwrap().len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nested_slices() {
        let buf = Buffer::new((0..16u8).collect::<Vec<_>>());
        let a = buf.slice(4, 8).unwrap();
        let b = a.slice(2, 2).unwrap();

        assert_eq!(&*a, &[4, 5, 6, 7, 8, 9, 10, 11][..]);
        assert_eq!(&*b, &[6, 7][..]);
        assert!(b.shares_owner(&buf));

        assert!(a.slice(7, 2).is_err());
        assert!(a.slice(u64::max_value(), 2).is_err());
        assert!(a.slice(8, 0).unwrap().is_empty());
    }

    #[test]
    fn takes_ownership_without_copying() {
        let bytes = vec![1u8; 4096];
        let ptr = bytes.as_ptr();

        let buf = Buffer::new(bytes);
        assert_eq!(buf.as_ptr(), ptr);
        assert_eq!(buf.slice(16, 16).unwrap().as_ptr(), ptr.wrapping_add(16));
    }

    #[test]
    fn pool() {
        let pool = BufferPool::new(1);
        let mut a = pool.take();
        a.extend_from_slice(b"abc");
        let b = pool.take();

        pool.recycle(a);
        pool.recycle(b);
        assert_eq!(pool.idle(), 1);
        assert!(pool.take().is_empty());
    }
}
