//! Chunked streaming deflate/inflate.
//!
//! The deflate engine counts in 32-bit quantities internally, so input and output are always
//! fed through it in chunks of `CHUNK_SIZE` bytes. This keeps scratch buffers small and lets
//! arbitrarily large blobs go through the codec. Streams are raw deflate, without zlib or gzip
//! framing.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::errors::*;

/// The size of the chunks handed to the deflate engine.
pub const CHUNK_SIZE: usize = 256 * 1024;

/// Uses the default compression level of the engine.
pub const DEFAULT_LEVEL: i32 = -1;

/// The highest, and slowest, compression level.
pub const MAX_LEVEL: i32 = 9;

fn compression_level(level: i32) -> Result<Compression> {
    match level {
        -1 => Ok(Compression::default()),
        0..=9 => Ok(Compression::new(level as u32)),
        _ => Err(Error::Compression(format!(
            "compression level {} is out of range [-1, 9].",
            level
        ))),
    }
}

/// A compressor context fed by `provide_input` and drained by `step`/`finish`.
pub struct DeflateStream<'a> {
    ctx: Compress,
    input: &'a [u8],
    finished: bool,
}

impl<'a> DeflateStream<'a> {
    /// Creates a compressor with `level` in [-1, 9].
    pub fn new(level: i32) -> Result<Self> {
        Ok(DeflateStream {
            ctx: Compress::new(compression_level(level)?, false),
            input: &[],
            finished: false,
        })
    }

    /// Hands the next piece of input to the compressor. Any input left from the previous call
    /// must have been consumed already.
    pub fn provide_input(&mut self, input: &'a [u8]) {
        debug_assert!(self.input.is_empty(), "previous input not consumed yet.");
        self.input = input;
    }

    /// Returns true if there is input left to consume.
    #[inline]
    pub fn has_input(&self) -> bool {
        !self.input.is_empty()
    }

    /// Compresses pending input into `output`, returns the number of bytes produced.
    pub fn step(&mut self, output: &mut [u8]) -> Result<usize> {
        let (_, produced) = self.run(output, FlushCompress::None)?;
        Ok(produced)
    }

    /// Flushes the rest of the stream into `output`. Returns the number of bytes produced and
    /// true once the end of the stream has been written completely.
    pub fn finish(&mut self, output: &mut [u8]) -> Result<(usize, bool)> {
        if self.finished {
            return Ok((0, true));
        }

        let (status, produced) = self.run(output, FlushCompress::Finish)?;
        self.finished = status == Status::StreamEnd;
        Ok((produced, self.finished))
    }

    fn run(&mut self, output: &mut [u8], flush: FlushCompress) -> Result<(Status, usize)> {
        let (in0, out0) = (self.ctx.total_in(), self.ctx.total_out());

        let status = self
            .ctx
            .compress(self.input, output, flush)
            .map_err(|err| Error::Compression(format!("{}", err)))?;

        let consumed = (self.ctx.total_in() - in0) as usize;
        let produced = (self.ctx.total_out() - out0) as usize;
        self.input = &self.input[consumed..];

        if consumed == 0 && produced == 0 && status != Status::StreamEnd && !output.is_empty() {
            return Err(Error::Compression("deflate engine stalled.".into()));
        }

        Ok((status, produced))
    }
}

/// A decompressor context fed by `provide_input` and drained by `step`.
pub struct InflateStream<'a> {
    ctx: Decompress,
    input: &'a [u8],
    finished: bool,
}

impl<'a> InflateStream<'a> {
    pub fn new() -> Self {
        InflateStream {
            ctx: Decompress::new(false),
            input: &[],
            finished: false,
        }
    }

    /// Hands the next piece of compressed input to the decompressor.
    pub fn provide_input(&mut self, input: &'a [u8]) {
        debug_assert!(self.input.is_empty(), "previous input not consumed yet.");
        self.input = input;
    }

    #[inline]
    pub fn has_input(&self) -> bool {
        !self.input.is_empty()
    }

    /// Returns true once the end of the compressed stream has been seen.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decompresses pending input into `output`, returns the number of bytes produced. Returns
    /// zero without error if more input is required.
    pub fn step(&mut self, output: &mut [u8]) -> Result<usize> {
        self.run(output).map(|(_, produced)| produced)
    }

    fn run(&mut self, output: &mut [u8]) -> Result<(usize, usize)> {
        if self.finished {
            return Ok((0, 0));
        }

        let (in0, out0) = (self.ctx.total_in(), self.ctx.total_out());

        let status = self
            .ctx
            .decompress(self.input, output, FlushDecompress::None)
            .map_err(|err| Error::Corrupt(format!("malformed deflate stream. {}", err)))?;

        let consumed = (self.ctx.total_in() - in0) as usize;
        let produced = (self.ctx.total_out() - out0) as usize;
        self.input = &self.input[consumed..];
        self.finished = status == Status::StreamEnd;

        Ok((consumed, produced))
    }
}

impl<'a> Default for InflateStream<'a> {
    fn default() -> Self {
        InflateStream::new()
    }
}

/// Compresses `input` with `level` in [-1, 9] into a raw deflate stream.
pub fn compress(input: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut stream = DeflateStream::new(level)?;
    let mut chunk = vec![0; CHUNK_SIZE];
    let mut out = Vec::with_capacity(input.len() / 2 + 64);

    for piece in input.chunks(CHUNK_SIZE) {
        stream.provide_input(piece);
        while stream.has_input() {
            let n = stream.step(&mut chunk)?;
            out.extend_from_slice(&chunk[..n]);
        }
    }

    loop {
        let (n, done) = stream.finish(&mut chunk)?;
        out.extend_from_slice(&chunk[..n]);
        if done {
            return Ok(out);
        }
    }
}

/// Decompresses a raw deflate stream. Truncated or corrupted streams are rejected with
/// `Error::Corrupt`, partial output is never returned.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    inflate(input, None)
}

/// Decompresses a raw deflate stream that must expand to exactly `expected` bytes.
pub fn decompress_exact(input: &[u8], expected: usize) -> Result<Vec<u8>> {
    let out = inflate(input, Some(expected))?;
    if out.len() != expected {
        return Err(Error::Corrupt(format!(
            "decompressed {} bytes while {} bytes were declared.",
            out.len(),
            expected
        )));
    }

    Ok(out)
}

fn inflate(input: &[u8], limit: Option<usize>) -> Result<Vec<u8>> {
    let mut stream = InflateStream::new();
    let mut chunk = vec![0; CHUNK_SIZE];
    // Declared sizes come from disk, never trust them for the initial reservation.
    let reserve = limit.unwrap_or_else(|| input.len().saturating_mul(2));
    let mut out = Vec::with_capacity(reserve.min(CHUNK_SIZE * 16));

    let mut pieces = input.chunks(CHUNK_SIZE);
    // The engine may hold back output after consuming all of its input, so only move on to the
    // next piece once a step did not fill the whole chunk.
    let mut drained = true;

    loop {
        if !stream.has_input() && drained {
            match pieces.next() {
                Some(piece) => stream.provide_input(piece),
                None => break,
            }
        }

        let (consumed, produced) = stream.run(&mut chunk)?;
        out.extend_from_slice(&chunk[..produced]);

        if let Some(limit) = limit {
            if out.len() > limit {
                return Err(Error::Corrupt(format!(
                    "decompressed stream exceeds the declared {} bytes.",
                    limit
                )));
            }
        }

        if stream.is_finished() {
            break;
        }

        if consumed == 0 && produced == 0 && stream.has_input() {
            return Err(Error::Corrupt("deflate stream stalled.".into()));
        }

        drained = produced < chunk.len();
    }

    if !stream.is_finished() {
        return Err(Error::Corrupt("truncated deflate stream.".into()));
    }

    if stream.has_input() || pieces.next().is_some() {
        return Err(Error::Corrupt("trailing bytes after deflate stream.".into()));
    }

    Ok(out)
}
