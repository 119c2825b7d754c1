//! Load units, a named bundle of assets stored as two files.
//!
//! ```text
//! <name>.lum  [u64 entry_count][entry]*, entry = [u64 offset][u64 size][u64 name_len][name bytes]
//! <name>.lup  raw concatenated payload, no header
//! ```
//!
//! Offsets are relative to the start of the payload. A `LoadUnit` loads the two files in two
//! separately claimed phases: asset names can be resolved into a `AssetResolutionCookie` as soon
//! as the metadata is ready, while the (potentially large) payload may still be on its way.

pub mod generator;

pub use self::generator::LoadUnitGenerator;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::async_state::{AsyncCell, AsyncState, Claim};
use crate::buffer::Buffer;
use crate::errors::*;
use crate::stream::prelude::*;

/// The extension of load unit metadata files.
pub const META_EXTENSION: &str = "lum";
/// The extension of load unit payload files.
pub const PAYLOAD_EXTENSION: &str = "lup";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadUnitElement {
    pub offset: u64,
    pub size: u64,
    pub name: String,
}

impl Encode for LoadUnitElement {
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        s.write_u64(self.offset);
        s.write_u64(self.size);
        s.write_string(&self.name);
    }
}

impl Decode for LoadUnitElement {
    fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
        LoadUnitElement {
            offset: s.read_u64(),
            size: s.read_u64(),
            name: s.read_string(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadUnitMetaData {
    pub elements: Vec<LoadUnitElement>,
}

impl LoadUnitMetaData {
    /// Reads the table from `s`. Duplicated names are rejected.
    pub fn read_from<S: InputStream + ?Sized>(s: &mut S) -> Result<Self> {
        let elements = s.read_seq::<LoadUnitElement>();
        s.check()?;

        let mut names = HashSet::new();
        for v in &elements {
            if !names.insert(v.name.as_str()) {
                return Err(Error::Corrupt(format!("duplicated load unit entry {}.", v.name)));
            }
        }

        Ok(LoadUnitMetaData { elements })
    }

    pub fn write_into<S: OutputStream + ?Sized>(&self, s: &mut S) -> Result<()> {
        s.write_seq(&self.elements);
        if s.eof() {
            Err(Error::IO("short write of load unit metadata.".into()))
        } else {
            Ok(())
        }
    }

    pub fn find(&self, name: &str) -> Option<&LoadUnitElement> {
        self.elements.iter().find(|v| v.name == name)
    }

    /// Checks that every entry lies within a payload of `len` bytes.
    pub fn validate(&self, len: u64) -> Result<()> {
        for v in &self.elements {
            let end = v.offset.checked_add(v.size);
            if end.map(|end| end > len).unwrap_or(true) {
                return Err(Error::Corrupt(format!(
                    "entry {} at {}+{} exceeds the payload with {} bytes.",
                    v.name, v.offset, v.size, len
                )));
            }
        }

        Ok(())
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

/// The combined state of both loading phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadUnitState {
    Initial,
    MetaLoading,
    MetaReady,
    DataLoading,
    DataReady,
    Error,
}

/// A located asset inside the payload of one specific load unit. Using it with any other unit
/// is a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetResolutionCookie {
    unit: u64,
    offset: u64,
    size: u64,
}

impl AssetResolutionCookie {
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

pub struct LoadUnit {
    id: u64,
    name: String,
    meta: Arc<AsyncCell<Arc<LoadUnitMetaData>>>,
    data: Arc<AsyncCell<Buffer>>,
}

impl LoadUnit {
    /// Creates an unloaded unit. `id` must be unique among the units of one loader.
    pub fn new<T: Into<String>>(id: u64, name: T) -> Self {
        LoadUnit {
            id,
            name: name.into(),
            meta: Arc::new(AsyncCell::new()),
            data: Arc::new(AsyncCell::new()),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the metadata file of this unit.
    pub fn meta_file_name(&self) -> String {
        format!("{}.{}", self.name, META_EXTENSION)
    }

    /// The name of the payload file of this unit.
    pub fn payload_file_name(&self) -> String {
        format!("{}.{}", self.name, PAYLOAD_EXTENSION)
    }

    pub fn state(&self) -> LoadUnitState {
        match (self.meta.state(), self.data.state()) {
            (AsyncState::Error, _) | (_, AsyncState::Error) => LoadUnitState::Error,
            (AsyncState::Initial, _) => LoadUnitState::Initial,
            (AsyncState::Loading, _) => LoadUnitState::MetaLoading,
            (AsyncState::Ready, AsyncState::Initial) => LoadUnitState::MetaReady,
            (AsyncState::Ready, AsyncState::Loading) => LoadUnitState::DataLoading,
            (AsyncState::Ready, AsyncState::Ready) => LoadUnitState::DataReady,
        }
    }

    #[inline]
    pub fn meta_state(&self) -> AsyncState {
        self.meta.state()
    }

    #[inline]
    pub fn data_state(&self) -> AsyncState {
        self.data.state()
    }

    /// Attempts to become the one loader of the metadata.
    pub fn try_claim_meta(&self) -> Option<Claim<Arc<LoadUnitMetaData>>> {
        self.meta.try_claim()
    }

    /// Attempts to become the one loader of the payload.
    pub fn try_claim_data(&self) -> Option<Claim<Buffer>> {
        self.data.try_claim()
    }

    /// Blocks current thread until the metadata is ready or failed.
    pub fn wait_meta(&self) -> Result<Arc<LoadUnitMetaData>> {
        self.meta.wait()
    }

    /// Blocks current thread until the payload is ready or failed.
    pub fn wait_data(&self) -> Result<Buffer> {
        self.data.wait()
    }

    /// Returns the metadata if it is ready.
    pub fn entries(&self) -> Option<Arc<LoadUnitMetaData>> {
        match self.meta.try_get() {
            Some(Ok(meta)) => Some(meta),
            _ => None,
        }
    }

    /// Runs `func` once the payload is terminal.
    pub fn on_data_ready<F>(&self, func: F)
    where
        F: FnOnce(&Result<Buffer>) + Send + 'static,
    {
        self.data.on_ready(func);
    }

    /// Locates `name` in this unit. Fails with `AsyncState` if the metadata is not ready yet.
    pub fn resolve(&self, name: &str) -> Result<AssetResolutionCookie> {
        let meta = match self.meta.try_get() {
            Some(Ok(meta)) => meta,
            Some(Err(err)) => return Err(err),
            None => {
                return Err(Error::AsyncState(format!(
                    "metadata of load unit {} is not ready.",
                    self.name
                )))
            }
        };

        meta.find(name)
            .map(|v| AssetResolutionCookie {
                unit: self.id,
                offset: v.offset,
                size: v.size,
            })
            .ok_or_else(|| Error::NotFound(format!("{} in load unit {}", name, self.name)))
    }

    /// Returns a zero-copy view of the located asset. Fails with `AsyncState` if the payload is
    /// not ready yet.
    pub fn view(&self, cookie: &AssetResolutionCookie) -> Result<Buffer> {
        if cookie.unit != self.id {
            return Err(Error::Logic(format!(
                "resolution cookie of unit {} used with load unit {} ({}).",
                cookie.unit, self.name, self.id
            )));
        }

        match self.data.try_get() {
            Some(Ok(payload)) => payload.slice(cookie.offset, cookie.size),
            Some(Err(err)) => Err(err),
            None => Err(Error::AsyncState(format!(
                "payload of load unit {} is not ready.",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for LoadUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LoadUnit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
