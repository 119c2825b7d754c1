//! Pack files, a single-file container of named, optionally compressed blobs.
//!
//! ```text
//! [u64 entry_count][entry]* [payload bytes]
//! entry = [u64 offset][u64 size][u64 compressed_size][u64 name_len][name bytes]
//! ```
//!
//! Offsets are absolute file offsets. A `compressed_size` of zero means the entry is stored raw,
//! otherwise the bytes at `offset` are a raw deflate stream of `compressed_size` bytes which
//! expands to exactly `size` bytes.

pub mod generator;
pub mod reader;
pub mod streams;

pub use self::generator::PackFileGenerator;
pub use self::reader::PackFileReader;
pub use self::streams::StreamPool;

use crate::errors::*;
use crate::stream::prelude::*;

/// The conventional extension of pack files.
pub const EXTENSION: &str = "pack";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackFileElement {
    pub offset: u64,
    pub size: u64,
    /// Zero if the entry is stored raw.
    pub compressed_size: u64,
    pub name: String,
}

impl PackFileElement {
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.compressed_size != 0
    }

    /// The number of bytes this entry occupies in the file.
    #[inline]
    pub fn stored_size(&self) -> u64 {
        if self.is_compressed() {
            self.compressed_size
        } else {
            self.size
        }
    }
}

impl Encode for PackFileElement {
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        s.write_u64(self.offset);
        s.write_u64(self.size);
        s.write_u64(self.compressed_size);
        s.write_string(&self.name);
    }
}

impl Decode for PackFileElement {
    fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
        PackFileElement {
            offset: s.read_u64(),
            size: s.read_u64(),
            compressed_size: s.read_u64(),
            name: s.read_string(),
        }
    }
}

/// The offset table at the head of a pack file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackFileMetaData {
    pub elements: Vec<PackFileElement>,
}

impl PackFileMetaData {
    /// Reads the table from the current position of `s`.
    pub fn read_from<S: InputStream + ?Sized>(s: &mut S) -> Result<Self> {
        let elements = s.read_seq::<PackFileElement>();
        s.check()?;
        Ok(PackFileMetaData { elements })
    }

    pub fn write_into<S: OutputStream + ?Sized>(&self, s: &mut S) -> Result<()> {
        s.write_seq(&self.elements);
        if s.eof() {
            Err(Error::IO("short write of pack file metadata.".into()))
        } else {
            Ok(())
        }
    }

    /// The number of bytes this table occupies once encoded.
    pub fn encoded_size(&self) -> u64 {
        let mut counter = CountingOutput::new();
        counter.write_seq(&self.elements);
        counter.tell()
    }

    /// Finds an element by name.
    pub fn find(&self, name: &str) -> Option<&PackFileElement> {
        self.elements.iter().find(|v| v.name == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
