//! Build-time inputs of the pack file and load unit generators.
//!
//! A description file is a JSON document with an ordered list of sections, each one listing
//! the files that go into one container:
//!
//! ```json
//! {
//!     "sections": [{
//!         "name": "textures",
//!         "entries": [
//!             { "external_path": "a.txt", "lookup": "descriptor_dir", "internal_path": "a.txt" },
//!             { "external_path": "b.bin", "internal_path": "b.bin", "compression_level": 9 }
//!         ]
//!     }]
//! }
//! ```

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::errors::*;
use crate::stream::prelude::*;

/// How the `external_path` of an entry is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupMode {
    /// Relative to the working directory of the process.
    WorkingDir,
    /// Relative to the directory of the description file.
    DescriptorDir,
}

impl Default for LookupMode {
    fn default() -> Self {
        LookupMode::WorkingDir
    }
}

fn resolve(lookup: LookupMode, external_path: &str, base: &Path) -> PathBuf {
    match lookup {
        LookupMode::WorkingDir => PathBuf::from(external_path),
        LookupMode::DescriptorDir => base.join(external_path),
    }
}

/// One file that goes into a pack file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackFileEntry {
    pub external_path: String,
    pub lookup: LookupMode,
    pub internal_path: String,
    /// `None` stores the file raw, otherwise -2 (raw), -1 (default) or 0..9.
    pub compression_level: Option<i32>,
}

impl PackFileEntry {
    /// The path of the source file, `base` being the directory of the description file.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        resolve(self.lookup, &self.external_path, base)
    }
}

/// One file that goes into a load unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadUnitEntry {
    pub external_path: String,
    pub lookup: LookupMode,
    pub internal_path: String,
}

impl LoadUnitEntry {
    /// The path of the source file, `base` being the directory of the description file.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        resolve(self.lookup, &self.external_path, base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionEntry {
    pub external_path: String,
    #[serde(default)]
    pub lookup: LookupMode,
    pub internal_path: String,
    #[serde(default)]
    pub compression_level: Option<i32>,
}

impl DescriptionEntry {
    pub fn to_pack_file_entry(&self) -> PackFileEntry {
        PackFileEntry {
            external_path: self.external_path.clone(),
            lookup: self.lookup,
            internal_path: self.internal_path.clone(),
            compression_level: self.compression_level,
        }
    }

    /// Load units never compress single entries, `compression_level` is ignored.
    pub fn to_load_unit_entry(&self) -> LoadUnitEntry {
        LoadUnitEntry {
            external_path: self.external_path.clone(),
            lookup: self.lookup,
            internal_path: self.internal_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<DescriptionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Description {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| Error::Corrupt(format!("malformed description. {}", err)))
    }

    /// Reads the description file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        Description::from_json(&json).map_err(|err| match err {
            Error::Corrupt(msg) => Error::Corrupt(format!("{}: {}", path.display(), msg)),
            err => err,
        })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|v| v.name == name)
    }
}

/// What a generator wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub entries: usize,
    pub bytes: u64,
}

/// Streams exactly `size` bytes of the file at `path` into `out`. Any difference between the
/// declared and the actual size is reported as `Error::IO`.
pub fn copy_exact<S: OutputStream + ?Sized>(path: &Path, out: &mut S, size: u64) -> Result<()> {
    let mut file = fs::File::open(path)?;
    let mut buf = vec![0; 64 * 1024];
    let mut copied = 0u64;

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }

        copied += n as u64;
        if copied > size {
            break;
        }

        if !out.write_all_bytes(&buf[..n]) {
            return Err(Error::IO(format!("short write while copying {}.", path.display())));
        }
    }

    if copied != size {
        return Err(Error::IO(format!(
            "{} has {} bytes, but {} were declared.",
            path.display(),
            copied,
            size
        )));
    }

    Ok(())
}
