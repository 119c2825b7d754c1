use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::asset::AssetClaim;
use crate::buffer::Buffer;
use crate::errors::*;
use crate::load_unit::{LoadUnit, LoadUnitMetaData};
use crate::stream::prelude::*;

use super::{Declined, LoadResult, Loader, PathPrefix};

/// Serves assets out of pinned load units.
///
/// The metadata and payload files of every unit are read through `source`, so units may live
/// on disk as well as inside a pack file. The metadata of a unit is loaded by the first request
/// that needs it, the payload by the first request that resolves a name in it. Both phases are
/// claimed separately, so concurrent requests never load either file twice.
pub struct LoadUnitLoader {
    source: PathPrefix,
    units: RwLock<Vec<Arc<LoadUnit>>>,
    next_id: AtomicU64,
}

impl LoadUnitLoader {
    pub fn new(source: PathPrefix) -> Self {
        LoadUnitLoader {
            source,
            units: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Pins the unit `name`, making its assets visible to this loader. Pinning a unit twice
    /// returns the unit pinned already.
    pub fn pin(&self, name: &str) -> Arc<LoadUnit> {
        let mut units = self.units.write().unwrap();
        if let Some(unit) = units.iter().find(|v| v.name() == name) {
            return unit.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let unit = Arc::new(LoadUnit::new(id, name));
        units.push(unit.clone());

        info!("Pinned load unit {}.", name);
        unit
    }

    /// Unpins the unit `name`. Assets served out of it stay valid for as long as they are held.
    pub fn unpin(&self, name: &str) -> bool {
        let mut units = self.units.write().unwrap();
        let len = units.len();
        units.retain(|v| v.name() != name);

        if units.len() != len {
            info!("Unpinned load unit {}.", name);
            true
        } else {
            false
        }
    }

    /// Returns the pinned unit `name`.
    pub fn unit(&self, name: &str) -> Option<Arc<LoadUnit>> {
        self.units
            .read()
            .unwrap()
            .iter()
            .find(|v| v.name() == name)
            .cloned()
    }

    /// A snapshot of every pinned unit, in pinning order.
    pub fn pinned(&self) -> Vec<Arc<LoadUnit>> {
        self.units.read().unwrap().clone()
    }

    /// Loads both phases of the pinned unit `name`, and blocks until they are done.
    pub fn preload(&self, name: &str) -> Result<()> {
        let unit = self
            .unit(name)
            .ok_or_else(|| Error::NotFound(format!("pinned load unit {}", name)))?;

        let meta = self.ensure_meta(&unit)?;
        self.ensure_data(&unit, &meta);
        unit.wait_data().map(|_| ())
    }

    fn ensure_meta(&self, unit: &LoadUnit) -> Result<Arc<LoadUnitMetaData>> {
        if let Some(claim) = unit.try_claim_meta() {
            claim.complete(self.read_meta(unit));
        }

        unit.wait_meta()
    }

    fn read_meta(&self, unit: &LoadUnit) -> Result<Arc<LoadUnitMetaData>> {
        let bytes = self.source.read_file(&unit.meta_file_name())?;
        let meta = LoadUnitMetaData::read_from(&mut SliceInput::new(&bytes))?;

        debug!(
            "Load unit {} has {} entries.",
            unit.name(),
            meta.len()
        );

        Ok(Arc::new(meta))
    }

    fn ensure_data(&self, unit: &LoadUnit, meta: &LoadUnitMetaData) {
        if let Some(claim) = unit.try_claim_data() {
            claim.complete(self.read_data(unit, meta));
        }
    }

    fn read_data(&self, unit: &LoadUnit, meta: &LoadUnitMetaData) -> Result<Buffer> {
        let bytes = self.source.read_file(&unit.payload_file_name())?;
        meta.validate(bytes.len() as u64)?;

        debug!(
            "Load unit {} payload is ready with {} bytes.",
            unit.name(),
            bytes.len()
        );

        Ok(Buffer::new(bytes))
    }
}

impl Loader for LoadUnitLoader {
    fn load(&self, claim: AssetClaim) -> LoadResult {
        for unit in self.pinned() {
            let meta = match self.ensure_meta(&unit) {
                Ok(meta) => meta,
                Err(err) => {
                    warn!("Skipped load unit {}. {}", unit.name(), err);
                    continue;
                }
            };

            let cookie = match unit.resolve(claim.name()) {
                Ok(cookie) => cookie,
                Err(_) => continue,
            };

            let target = unit.clone();
            unit.on_data_ready(move |result| match *result {
                Ok(_) => claim.complete(target.view(&cookie)),
                Err(ref err) => claim.complete(Err(err.clone())),
            });

            self.ensure_data(&unit, &meta);
            return Ok(());
        }

        let reason = Error::NotFound(format!("{} in any pinned load unit", claim.name()));
        Err(Declined::new(claim, reason))
    }

    fn pin_load_unit(&self, name: &str) -> bool {
        self.pin(name);
        true
    }

    fn unpin_load_unit(&self, name: &str) -> bool {
        self.unpin(name);
        true
    }
}
