use std::io::Write;

use super::StreamFlags;

/// A byte sink.
pub trait OutputStream {
    /// Writes up to `buf.len()` bytes, returns the number of bytes actually written.
    fn write_bytes(&mut self, buf: &[u8]) -> usize;

    /// The number of bytes written so far.
    fn tell(&self) -> u64;

    fn flags(&self) -> StreamFlags;

    fn flags_mut(&mut self) -> &mut StreamFlags;

    #[inline]
    fn eof(&self) -> bool {
        self.flags().eof
    }

    #[inline]
    fn set_eof(&mut self) {
        self.flags_mut().eof = true;
    }

    #[inline]
    fn clear(&mut self) {
        *self.flags_mut() = StreamFlags::default();
    }

    /// Writes all of `buf`, or raises `eof` and returns false.
    fn write_all_bytes(&mut self, buf: &[u8]) -> bool {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write_bytes(&buf[written..]);
            if n == 0 {
                self.set_eof();
                return false;
            }

            written += n;
        }

        true
    }
}

/// Writes into an owned, growable vector.
#[derive(Debug, Default)]
pub struct VecOutput {
    bytes: Vec<u8>,
    flags: StreamFlags,
}

impl VecOutput {
    pub fn new() -> Self {
        VecOutput::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }
}

impl OutputStream for VecOutput {
    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> usize {
        self.bytes.extend_from_slice(buf);
        buf.len()
    }

    #[inline]
    fn tell(&self) -> u64 {
        self.bytes.len() as u64
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

/// Discards everything and only counts bytes. Useful to learn the encoded size of a value.
#[derive(Debug, Default)]
pub struct CountingOutput {
    len: u64,
    flags: StreamFlags,
}

impl CountingOutput {
    pub fn new() -> Self {
        CountingOutput::default()
    }
}

impl OutputStream for CountingOutput {
    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> usize {
        self.len += buf.len() as u64;
        buf.len()
    }

    #[inline]
    fn tell(&self) -> u64 {
        self.len
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

/// Writes into any `std::io` sink. IO errors raise `eof`.
#[derive(Debug)]
pub struct WriterOutput<W: Write> {
    inner: W,
    pos: u64,
    flags: StreamFlags,
}

impl<W: Write> WriterOutput<W> {
    pub fn new(inner: W) -> Self {
        WriterOutput {
            inner,
            pos: 0,
            flags: StreamFlags::default(),
        }
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> OutputStream for WriterOutput<W> {
    fn write_bytes(&mut self, buf: &[u8]) -> usize {
        loop {
            match self.inner.write(buf) {
                Ok(n) => {
                    self.pos += n as u64;
                    return n;
                }
                Err(ref err) if err.kind() == ::std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!("Failed to write into stream. {}", err);
                    self.set_eof();
                    return 0;
                }
            }
        }
    }

    #[inline]
    fn tell(&self) -> u64 {
        self.pos
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
