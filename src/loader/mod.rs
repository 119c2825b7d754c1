//! Pluggable strategies that resolve an asset name into bytes.
//!
//! The `AssetManager` offers the claim of an asset to each registered `Loader` in order, and
//! stops at the first one that takes it. A loader that can not produce the asset hands the claim
//! back together with the reason; the manager moves on to the next loader for recoverable
//! reasons (see `Error::is_recoverable`), and fails the asset with anything else.

pub mod file;
pub mod load_unit;
pub mod native;

pub use self::file::FileLoader;
pub use self::load_unit::LoadUnitLoader;
pub use self::native::NativeFileReader;

use std::fmt;
use std::sync::Arc;

use crate::asset::AssetClaim;
use crate::errors::*;

/// A byte source that resolves `name` relative to `prefix`.
pub trait FileReader: Send + Sync + 'static {
    /// Reads the whole file `name` under `prefix`. Missing or unreadable files are reported as
    /// `Error::NotFound`.
    fn read_file(&self, prefix: &str, name: &str) -> Result<Vec<u8>>;
}

/// One element of a search path: a reader capability and the prefix it reads under.
#[derive(Clone)]
pub struct PathPrefix {
    pub reader: Arc<dyn FileReader>,
    pub prefix: String,
}

impl PathPrefix {
    pub fn new<R, T>(reader: Arc<R>, prefix: T) -> Self
    where
        R: FileReader,
        T: Into<String>,
    {
        PathPrefix {
            reader,
            prefix: prefix.into(),
        }
    }

    #[inline]
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.reader.read_file(&self.prefix, name)
    }
}

impl fmt::Debug for PathPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PathPrefix")
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// A claim that a loader declined, with the reason.
#[derive(Debug)]
pub struct Declined {
    pub claim: AssetClaim,
    pub reason: Error,
}

impl Declined {
    pub fn new(claim: AssetClaim, reason: Error) -> Self {
        Declined { claim, reason }
    }
}

pub type LoadResult = ::std::result::Result<(), Declined>;

pub trait Loader: Send + Sync + 'static {
    /// Attempts to produce the bytes of the claimed asset. Returning `Ok` means this loader took
    /// responsibility and completes the claim, now or later from another thread.
    fn load(&self, claim: AssetClaim) -> LoadResult;

    /// Pins a load unit. Returns false if this loader does not support load units.
    fn pin_load_unit(&self, _name: &str) -> bool {
        false
    }

    /// Unpins a load unit. Returns false if this loader does not support load units.
    fn unpin_load_unit(&self, _name: &str) -> bool {
        false
    }
}
