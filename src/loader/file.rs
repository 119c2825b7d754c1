use std::sync::RwLock;

use crate::asset::AssetClaim;
use crate::buffer::Buffer;
use crate::errors::*;

use super::{Declined, LoadResult, Loader, PathPrefix};

/// Searches an ordered list of path prefixes for the requested name.
#[derive(Debug, Default)]
pub struct FileLoader {
    prefixes: RwLock<Vec<PathPrefix>>,
}

impl FileLoader {
    pub fn new() -> Self {
        FileLoader::default()
    }

    pub fn with_prefixes(prefixes: Vec<PathPrefix>) -> Self {
        FileLoader {
            prefixes: RwLock::new(prefixes),
        }
    }

    /// Appends `prefix` to the end of the search path.
    pub fn add_prefix(&self, prefix: PathPrefix) {
        info!("Adds search path prefix {}.", prefix.prefix);
        self.prefixes.write().unwrap().push(prefix);
    }

    pub fn clear_prefixes(&self) {
        self.prefixes.write().unwrap().clear();
    }

    pub fn prefixes(&self) -> Vec<PathPrefix> {
        self.prefixes.read().unwrap().clone()
    }

    /// Reads `name` from the first prefix that has it.
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        // Readers may block on IO, search over a snapshot of the list.
        let prefixes = self.prefixes();
        for v in &prefixes {
            match v.read_file(name) {
                Ok(bytes) => return Ok(bytes),
                Err(ref err) if err.is_recoverable() => continue,
                Err(err) => return Err(err),
            }
        }

        Err(Error::NotFound(format!("{} in {} search paths", name, prefixes.len())))
    }
}

impl Loader for FileLoader {
    fn load(&self, claim: AssetClaim) -> LoadResult {
        match self.read(claim.name()) {
            Ok(bytes) => {
                claim.complete(Ok(Buffer::new(bytes)));
                Ok(())
            }
            Err(err) => Err(Declined::new(claim, err)),
        }
    }
}
