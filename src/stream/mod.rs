//! The binary stream codec: typed little-endian read and write primitives over abstract byte
//! sources and sinks.
//!
//! Readers and writers never fail eagerly. A short read raises the `eof` flag, semantically
//! invalid data raises the `invalid` flag, and the typed helpers return a zeroed value in both
//! cases. Callers perform a batch of reads and then `check` the flags once, treating any raised
//! flag as failure. The flags stay raised until the caller `clear`s them.
//!
//! ```
//! use stockpile::stream::prelude::*;
//!
//! let mut output = VecOutput::new();
//! output.write_value(&7u32);
//! output.write_value(&"hello".to_owned());
//!
//! let bytes = output.into_inner();
//! let mut input = SliceInput::new(&bytes);
//! assert_eq!(input.read_value::<u32>(), 7);
//! assert_eq!(input.read_value::<String>(), "hello");
//! assert!(input.check().is_ok());
//! ```

pub mod codec;
pub mod input;
pub mod output;

pub mod prelude {
    pub use super::codec::{Decode, Encode, StreamRead, StreamWrite};
    pub use super::input::{InputStream, ReaderInput, SliceInput};
    pub use super::output::{CountingOutput, OutputStream, VecOutput, WriterOutput};
    pub use super::StreamFlags;
}

/// The sticky failure flags shared by all streams.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamFlags {
    /// Set on short reads/writes, or when a declared length can not be satisfied.
    pub eof: bool,
    /// Set when bytes were read fine but do not form a valid value.
    pub invalid: bool,
}

impl StreamFlags {
    #[inline]
    pub fn any(self) -> bool {
        self.eof || self.invalid
    }
}
