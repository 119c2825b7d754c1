use std::sync::Arc;

use crate::buffer::Buffer;
use crate::errors::*;
use crate::promise::Promise;

/// The pending result of `AssetManager::load_future`.
pub struct LoadFuture {
    name: String,
    promise: Arc<Promise>,
}

impl LoadFuture {
    pub(crate) fn new(name: String, promise: Arc<Promise>) -> Self {
        LoadFuture { name, promise }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the result has arrived.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.promise.is_ready()
    }

    /// Takes the result if it has arrived.
    pub fn try_take(&mut self) -> Option<Result<Buffer>> {
        self.promise.try_take()
    }

    /// Blocks current thread until the result arrives.
    pub fn wait(self) -> Result<Buffer> {
        match self.promise.wait() {
            Some(result) => result,
            None => Err(Error::AsyncState(format!(
                "result of {} has been taken already.",
                self.name
            ))),
        }
    }
}
