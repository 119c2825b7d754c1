use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::build::{self, CompileReport, LoadUnitEntry};
use crate::errors::*;
use crate::stream::prelude::*;

use super::{LoadUnitElement, LoadUnitMetaData, META_EXTENSION, PAYLOAD_EXTENSION};

#[derive(Debug, Clone)]
struct Pending {
    path: PathBuf,
    name: String,
    size: u64,
}

/// Builds the metadata and payload files of a load unit out of files on disk.
#[derive(Debug, Default)]
pub struct LoadUnitGenerator {
    entries: Vec<Pending>,
}

impl LoadUnitGenerator {
    pub fn new() -> Self {
        LoadUnitGenerator::default()
    }

    /// Adds the file at `path` under `name`.
    pub fn add_file<P, T>(&mut self, path: P, name: T) -> Result<()>
    where
        P: AsRef<Path>,
        T: Into<String>,
    {
        let path = path.as_ref();
        let name = name.into();

        if self.entries.iter().any(|v| v.name == name) {
            return Err(Error::Logic(format!("duplicated load unit entry {}.", name)));
        }

        let metadata = fs::metadata(path)
            .map_err(|err| Error::NotFound(format!("{} ({})", path.display(), err)))?;

        if !metadata.is_file() {
            return Err(Error::NotFound(format!("{} is not a file", path.display())));
        }

        self.entries.push(Pending {
            path: path.to_owned(),
            name,
            size: metadata.len(),
        });

        Ok(())
    }

    /// Adds an entry of a description section. `base` is the directory of the description file.
    pub fn add_entry(&mut self, entry: &LoadUnitEntry, base: &Path) -> Result<()> {
        self.add_file(entry.resolve(base), entry.internal_path.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes `<name>.lum` and `<name>.lup` into the directory `dir`.
    pub fn compile<P: AsRef<Path>>(&self, dir: P, name: &str) -> Result<CompileReport> {
        let dir = dir.as_ref();

        let mut offset = 0u64;
        let mut elements = Vec::with_capacity(self.entries.len());
        for v in &self.entries {
            elements.push(LoadUnitElement {
                offset,
                size: v.size,
                name: v.name.clone(),
            });

            offset = offset
                .checked_add(v.size)
                .ok_or_else(|| Error::BufferTooLarge(offset))?;
        }

        let meta = LoadUnitMetaData { elements };

        let meta_path = dir.join(format!("{}.{}", name, META_EXTENSION));
        let mut out = WriterOutput::new(BufWriter::new(fs::File::create(&meta_path)?));
        meta.write_into(&mut out)?;
        out.get_mut().flush()?;
        let meta_bytes = out.tell();

        let payload_path = dir.join(format!("{}.{}", name, PAYLOAD_EXTENSION));
        let mut out = WriterOutput::new(BufWriter::new(fs::File::create(&payload_path)?));
        for (v, element) in self.entries.iter().zip(meta.elements.iter()) {
            if out.tell() != element.offset {
                return Err(Error::Logic(format!(
                    "entry {} is about to be written at {}, but its offset is {}.",
                    element.name,
                    out.tell(),
                    element.offset
                )));
            }

            build::copy_exact(&v.path, &mut out, v.size)?;
        }

        out.get_mut().flush()?;

        let report = CompileReport {
            entries: meta.len(),
            bytes: meta_bytes + out.tell(),
        };

        info!(
            "Compiled load unit {} into {} with {} entries, {} bytes.",
            name,
            dir.display(),
            report.entries,
            report.bytes
        );

        Ok(report)
    }
}
