use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::errors::*;

use super::StreamFlags;

/// A seekable byte source.
pub trait InputStream {
    /// Reads up to `buf.len()` bytes, returns the number of bytes actually read.
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize;

    /// The total size of this source in bytes.
    fn size(&self) -> u64;

    /// The current read position.
    fn tell(&self) -> u64;

    /// Moves the read position. Seeking past the end raises `eof`.
    fn seek(&mut self, pos: u64);

    fn flags(&self) -> StreamFlags;

    fn flags_mut(&mut self) -> &mut StreamFlags;

    #[inline]
    fn eof(&self) -> bool {
        self.flags().eof
    }

    #[inline]
    fn invalid(&self) -> bool {
        self.flags().invalid
    }

    #[inline]
    fn set_eof(&mut self) {
        self.flags_mut().eof = true;
    }

    #[inline]
    fn set_invalid(&mut self) {
        self.flags_mut().invalid = true;
    }

    /// Clears both failure flags.
    #[inline]
    fn clear(&mut self) {
        *self.flags_mut() = StreamFlags::default();
    }

    /// The number of bytes between the read position and the end.
    #[inline]
    fn remaining(&self) -> u64 {
        self.size().saturating_sub(self.tell())
    }

    /// Fills `buf` completely, or raises `eof` and returns false.
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> bool {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_bytes(&mut buf[filled..]);
            if n == 0 {
                self.set_eof();
                return false;
            }

            filled += n;
        }

        true
    }

    /// Converts raised flags into an error.
    fn check(&self) -> Result<()> {
        let flags = self.flags();
        if flags.eof {
            Err(Error::IO(format!(
                "unexpected end of stream at {} of {} bytes.",
                self.tell(),
                self.size()
            )))
        } else if flags.invalid {
            Err(Error::Corrupt(format!(
                "invalid data near {} of {} bytes.",
                self.tell(),
                self.size()
            )))
        } else {
            Ok(())
        }
    }
}

/// Reads from a borrowed byte slice.
#[derive(Debug)]
pub struct SliceInput<'a> {
    bytes: &'a [u8],
    pos: usize,
    flags: StreamFlags,
}

impl<'a> SliceInput<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        SliceInput {
            bytes,
            pos: 0,
            flags: StreamFlags::default(),
        }
    }
}

impl<'a> InputStream for SliceInput<'a> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.bytes.len() - self.pos);
        buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    #[inline]
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    #[inline]
    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, pos: u64) {
        if pos > self.bytes.len() as u64 {
            self.pos = self.bytes.len();
            self.set_eof();
        } else {
            self.pos = pos as usize;
        }
    }

    #[inline]
    fn flags(&self) -> StreamFlags {
        self.flags
    }

    #[inline]
    fn flags_mut(&mut self) -> &mut StreamFlags {
        &mut self.flags
    }
}

/// Reads from any `std::io` source that can seek, such like a `File`. IO errors raise `eof`.
#[derive(Debug)]
pub struct ReaderInput<R: Read + Seek> {
    inner: R,
    size: u64,
    pos: u64,
    flags: StreamFlags,
}

impl ReaderInput<fs::File> {
    /// Opens the file at `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path)?;
        ReaderInput::new(file)
    }
}

impl<R: Read + Seek> ReaderInput<R> {
    /// Wraps `inner`, the current position of `inner` becomes the read position.
    pub fn new(mut inner: R) -> Result<Self> {
        let pos = inner.seek(SeekFrom::Current(0))?;
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(pos))?;

        Ok(ReaderInput {
            inner,
            size,
            pos,
            flags: StreamFlags::default(),
        })
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> InputStream for ReaderInput<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        loop {
            match self.inner.read(buf) {
                Ok(n) => {
                    self.pos += n as u64;
                    return n;
                }
                Err(ref err) if err.kind() == ::std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!("Failed to read from stream. {}", err);
                    self.set_eof();
                    return 0;
                }
            }
        }
    }

    #[inline]
    fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    fn tell(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) {
        if pos > self.size {
            self.set_eof();
            return;
        }

        match self.inner.seek(SeekFrom::Start(pos)) {
            Ok(v) => self.pos = v,
            Err(err) => {
                warn!("Failed to seek stream to {}. {}", pos, err);
                self.set_eof();
            }
        }
    }

    #[inline]
    fn flags(&self) -> StreamFlags {
        self.flags
    }

    #[inline]
    fn flags_mut(&mut self) -> &mut StreamFlags {
        &mut self.flags
    }
}
