use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::buffer::BufferPool;
use crate::compression;
use crate::errors::*;
use crate::loader::FileReader;
use crate::stream::prelude::*;

use super::{PackFileMetaData, StreamPool};

/// Reads entries out of pack files. The `prefix` of every request is the path of a pack file;
/// its offset table is read once and cached, and file handles are pooled per pack file.
///
/// Any failure below the lookup, such like IO errors or corrupted entries, is logged and
/// reported as `NotFound`, so the next loader in the chain still gets a chance.
pub struct PackFileReader {
    streams: StreamPool,
    metadata: RwLock<HashMap<String, Arc<PackFileMetaData>>>,
    bufs: BufferPool,
}

impl PackFileReader {
    pub fn new() -> Self {
        PackFileReader {
            streams: StreamPool::new(),
            metadata: RwLock::new(HashMap::new()),
            bufs: BufferPool::new(4),
        }
    }

    /// Returns the offset table of the pack file at `prefix`, reading it if necessary.
    pub fn metadata(&self, prefix: &str) -> Result<Arc<PackFileMetaData>> {
        if let Some(meta) = self.metadata.read().unwrap().get(prefix) {
            return Ok(meta.clone());
        }

        let meta = {
            let lease = self.streams.acquire(prefix)?;
            let mut stream = lease.stream();
            stream.seek(0);
            Arc::new(PackFileMetaData::read_from(&mut *stream)?)
        };

        info!("Opened pack file {} with {} entries.", prefix, meta.len());

        let mut metadata = self.metadata.write().unwrap();
        Ok(metadata
            .entry(prefix.to_owned())
            .or_insert(meta)
            .clone())
    }

    /// Forgets the cached table and pooled handles of `prefix`.
    pub fn close(&self, prefix: &str) {
        self.metadata.write().unwrap().remove(prefix);
        self.streams.close(prefix);
    }

    /// The stream pool of this reader.
    #[inline]
    pub fn streams(&self) -> &StreamPool {
        &self.streams
    }

    fn read_entry(&self, prefix: &str, name: &str) -> Result<Vec<u8>> {
        let meta = self.metadata(prefix)?;
        let element = meta
            .find(name)
            .ok_or_else(|| Error::NotFound(format!("{} in pack file {}", name, prefix)))?;

        let size = to_usize(element.size)?;
        let stored = to_usize(element.stored_size())?;

        let lease = self.streams.acquire(prefix)?;
        let mut stream = lease.stream();

        let end = element.offset.checked_add(element.stored_size());
        if end.map(|end| end > stream.size()).unwrap_or(true) {
            return Err(Error::Corrupt(format!(
                "entry {} at {}+{} exceeds pack file {} with {} bytes.",
                name,
                element.offset,
                element.stored_size(),
                prefix,
                stream.size()
            )));
        }

        stream.seek(element.offset);

        if !element.is_compressed() {
            let mut bytes = vec![0; size];
            stream.read_exact_bytes(&mut bytes);
            stream.check()?;
            return Ok(bytes);
        }

        let mut scratch = self.bufs.take();
        scratch.resize(stored, 0);
        stream.read_exact_bytes(&mut scratch);

        let result = stream
            .check()
            .and_then(|_| compression::decompress_exact(&scratch, size))
            .map_err(|err| Error::IO(format!("pack file {} appears corrupt. {}", prefix, err)));

        self.bufs.recycle(scratch);
        result
    }

    /// The number of idle scratch buffers kept for compressed reads.
    #[inline]
    pub fn idle_buffers(&self) -> usize {
        self.bufs.idle()
    }
}

impl Default for PackFileReader {
    fn default() -> Self {
        PackFileReader::new()
    }
}

impl FileReader for PackFileReader {
    fn read_file(&self, prefix: &str, name: &str) -> Result<Vec<u8>> {
        match self.read_entry(prefix, name) {
            Ok(bytes) => Ok(bytes),
            Err(Error::NotFound(msg)) => Err(Error::NotFound(msg)),
            Err(err) => {
                warn!("Failed to read {} from pack file {}. {}", name, prefix, err);
                Err(Error::NotFound(format!("{} in pack file {}", name, prefix)))
            }
        }
    }
}
