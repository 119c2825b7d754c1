use std::fs;
use std::path::Path;

use crate::errors::*;

use super::FileReader;

/// Reads files from the native filesystem, `prefix` being a directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFileReader {}

impl NativeFileReader {
    pub fn new() -> Self {
        NativeFileReader {}
    }
}

impl FileReader for NativeFileReader {
    fn read_file(&self, prefix: &str, name: &str) -> Result<Vec<u8>> {
        let path = Path::new(prefix).join(name);
        fs::read(&path).map_err(|err| {
            debug!("Could not read {}. {}", path.display(), err);
            Error::NotFound(format!("{}", path.display()))
        })
    }
}
