//! `stockpile` is a small content store for games and tools. Named byte blobs are produced once,
//! cached, loaded at most once concurrently, optionally bundled and compressed, and handed out as
//! immutable, reference-counted buffers or zero-copy sub-views into larger buffers.
//!
//! # Assets
//!
//! An _asset_ is a named, immutable blob of bytes. Users never construct them directly; the
//! `AssetManager` finds or creates an `Asset` for a name and offers it to every registered
//! `Loader` in order. The first loader that claims the asset produces its bytes, and every caller
//! that asked for the same name observes the same result.
//!
//! # Containers
//!
//! Two binary container formats are supported:
//!
//! 1. _Pack files_ (`.pack`), a flat bag of named blobs behind a leading offset table, each blob
//! optionally deflate-compressed.
//! 2. _Load units_, a named bundle stored as a metadata file (`.lum`) and a payload file (`.lup`).
//! Metadata and payload are loaded in two separate phases, so an asset name can be resolved into
//! an offset before the payload transfer completes.
//!
//! Both formats are produced by generators at build time (see the `stockpile-cli` tool), and read
//! back at runtime through the loaders in `loader`.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

extern crate byteorder;
extern crate cgmath;
extern crate crossbeam_deque;
extern crate flate2;
extern crate serde_json;
extern crate smallvec;

pub mod errors;

pub mod async_state;
pub mod buffer;
pub mod compression;
pub mod promise;
pub mod sched;
pub mod stream;

pub mod asset;
pub mod build;
pub mod load_unit;
pub mod loader;
pub mod manager;
pub mod pack;

pub mod prelude {
    pub use crate::asset::Asset;
    pub use crate::async_state::AsyncState;
    pub use crate::buffer::Buffer;
    pub use crate::errors::{Error, Result};
    pub use crate::load_unit::{LoadUnit, LoadUnitGenerator};
    pub use crate::loader::{FileLoader, FileReader, LoadUnitLoader, Loader, NativeFileReader};
    pub use crate::loader::PathPrefix;
    pub use crate::manager::{AssetManager, ManagerParams};
    pub use crate::pack::{PackFileGenerator, PackFileReader};
    pub use crate::promise::Promise;
}
