use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::build::{self, CompileReport, PackFileEntry};
use crate::compression;
use crate::errors::*;
use crate::stream::prelude::*;

use super::{PackFileElement, PackFileMetaData};

/// Stores the entry without compression.
pub const LEVEL_NONE: i32 = -2;

#[derive(Debug, Clone)]
struct Pending {
    path: PathBuf,
    name: String,
    size: u64,
    level: Option<i32>,
}

/// Builds a pack file out of files on disk.
///
/// Entries are written in the order they were added. Source files are only touched again in
/// `compile`, so they must not change in between.
#[derive(Debug, Default)]
pub struct PackFileGenerator {
    entries: Vec<Pending>,
}

impl PackFileGenerator {
    pub fn new() -> Self {
        PackFileGenerator::default()
    }

    /// Adds the file at `path`, stored raw under `name`.
    pub fn add_file<P, T>(&mut self, path: P, name: T) -> Result<()>
    where
        P: AsRef<Path>,
        T: Into<String>,
    {
        self.push(path.as_ref(), name.into(), None)
    }

    /// Adds the file at `path`, stored under `name` as a deflate stream. `level` is clamped to
    /// at most 9, `-1` selects the default level and `-2` stores the file raw.
    pub fn add_file_compressed<P, T>(&mut self, path: P, name: T, level: i32) -> Result<()>
    where
        P: AsRef<Path>,
        T: Into<String>,
    {
        let level = level.min(compression::MAX_LEVEL);
        let level = if level <= LEVEL_NONE { None } else { Some(level) };
        self.push(path.as_ref(), name.into(), level)
    }

    /// Adds an entry of a description section. `base` is the directory of the description file.
    pub fn add_entry(&mut self, entry: &PackFileEntry, base: &Path) -> Result<()> {
        let path = entry.resolve(base);
        match entry.compression_level {
            Some(level) => self.add_file_compressed(path, entry.internal_path.as_str(), level),
            None => self.add_file(path, entry.internal_path.as_str()),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, path: &Path, name: String, level: Option<i32>) -> Result<()> {
        if self.entries.iter().any(|v| v.name == name) {
            return Err(Error::Logic(format!("duplicated pack file entry {}.", name)));
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
            level,
        });

        Ok(())
    }

    /// Writes the pack file into `output`.
    pub fn compile<P: AsRef<Path>>(&self, output: P) -> Result<CompileReport> {
        let output = output.as_ref();

        // Compressed sizes are only known after compression, so those entries are deflated
        // into memory ahead of the offset computation.
        let mut blobs = Vec::with_capacity(self.entries.len());
        for v in &self.entries {
            match v.level {
                Some(level) => {
                    let raw = fs::read(&v.path)?;
                    if raw.len() as u64 != v.size {
                        return Err(Error::IO(format!(
                            "{} changed size from {} to {} bytes.",
                            v.path.display(),
                            v.size,
                            raw.len()
                        )));
                    }

                    blobs.push(Some(compression::compress(&raw, level)?));
                }
                None => blobs.push(None),
            }
        }

        let mut offset = 0;
        let mut elements = Vec::with_capacity(self.entries.len());
        for (v, blob) in self.entries.iter().zip(blobs.iter()) {
            let compressed_size = blob.as_ref().map(|b| b.len() as u64).unwrap_or(0);
            let element = PackFileElement {
                offset,
                size: v.size,
                compressed_size,
                name: v.name.clone(),
            };

            offset += element.stored_size();
            elements.push(element);
        }

        let meta = PackFileMetaData::with_payload_offsets(elements)?;

        let file = fs::File::create(output)?;
        let mut out = WriterOutput::new(BufWriter::new(file));
        meta.write_into(&mut out)?;

        for ((v, blob), element) in self.entries.iter().zip(blobs.iter()).zip(meta.elements.iter()) {
            if out.tell() != element.offset {
                return Err(Error::Logic(format!(
                    "entry {} is about to be written at {}, but its offset is {}.",
                    element.name,
                    out.tell(),
                    element.offset
                )));
            }

            match *blob {
                Some(ref bytes) => {
                    if !out.write_all_bytes(bytes) {
                        return Err(Error::IO(format!("short write of entry {}.", v.name)));
                    }
                }
                None => build::copy_exact(&v.path, &mut out, v.size)?,
            }
        }

        out.get_mut().flush()?;

        let report = CompileReport {
            entries: meta.len(),
            bytes: out.tell(),
        };

        info!(
            "Compiled pack file {} with {} entries, {} bytes.",
            output.display(),
            report.entries,
            report.bytes
        );

        Ok(report)
    }
}

impl PackFileMetaData {
    /// Shifts the offsets of `elements`, which are relative to the payload region, by the
    /// encoded size of the table itself. The size of the table must not change by doing so.
    pub fn with_payload_offsets(elements: Vec<PackFileElement>) -> Result<Self> {
        let mut meta = PackFileMetaData { elements };
        let header = meta.encoded_size();

        for v in &mut meta.elements {
            v.offset = v
                .offset
                .checked_add(header)
                .ok_or_else(|| Error::BufferTooLarge(v.offset))?;
        }

        let fixed = meta.encoded_size();
        if fixed != header {
            return Err(Error::Logic(format!(
                "pack file metadata size did not converge ({} != {}).",
                fixed, header
            )));
        }

        Ok(meta)
    }
}
