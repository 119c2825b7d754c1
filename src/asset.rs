use std::fmt;
use std::sync::Arc;

use crate::async_state::{AsyncCell, AsyncState, Claim};
use crate::buffer::Buffer;
use crate::errors::*;

/// A named, immutably cached blob of bytes with an asynchronous loading state.
///
/// Assets are created by the `AssetManager` on the first request of a name, and shared between
/// the manager's registry and every caller holding it. The payload is written at most once, by
/// the holder of the loading claim, and never changes after it became visible.
pub struct Asset {
    name: String,
    cell: Arc<AsyncCell<Buffer>>,
}

impl Asset {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Asset {
            name: name.into(),
            cell: Arc::new(AsyncCell::new()),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn state(&self) -> AsyncState {
        self.cell.state()
    }

    /// Attempts to become the one loader of this asset.
    pub fn try_claim(self: &Arc<Self>) -> Option<AssetClaim> {
        self.cell.try_claim().map(|claim| AssetClaim {
            asset: self.clone(),
            claim,
        })
    }

    /// Returns the bytes if this asset is ready.
    pub fn bytes(&self) -> Option<Buffer> {
        match self.cell.try_get() {
            Some(Ok(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the terminal result, or `None` if this asset is still pending.
    pub fn result(&self) -> Option<Result<Buffer>> {
        self.cell.try_get()
    }

    /// Blocks current thread until this asset becomes ready or fails.
    pub fn wait(&self) -> Result<Buffer> {
        self.cell.wait()
    }

    /// Runs `on_success` or `on_error` once this asset is terminal. Both run immediately if it
    /// is terminal already.
    pub fn run_when_ready<F1, F2>(&self, on_success: F1, on_error: F2)
    where
        F1: FnOnce(&Buffer) + Send + 'static,
        F2: FnOnce(&Error) + Send + 'static,
    {
        self.cell.on_ready(move |result| match *result {
            Ok(ref bytes) => on_success(bytes),
            Err(ref err) => on_error(err),
        });
    }

    /// Runs `func` with the terminal result of this asset.
    pub fn on_ready<F>(&self, func: F)
    where
        F: FnOnce(&Result<Buffer>) + Send + 'static,
    {
        self.cell.on_ready(func);
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Asset")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// The exclusive right to produce the bytes of an asset. It is handed from loader to loader
/// until one of them completes it.
pub struct AssetClaim {
    asset: Arc<Asset>,
    claim: Claim<Buffer>,
}

impl AssetClaim {
    #[inline]
    pub fn name(&self) -> &str {
        self.asset.name()
    }

    #[inline]
    pub fn asset(&self) -> &Arc<Asset> {
        &self.asset
    }

    /// Publishes the result of loading.
    pub fn complete(self, result: Result<Buffer>) {
        match result {
            Ok(ref bytes) => debug!("Asset {} is ready with {} bytes.", self.name(), bytes.len()),
            Err(ref err) => debug!("Asset {} failed. {}", self.name(), err),
        }

        self.claim.complete(result);
    }
}

impl fmt::Debug for AssetClaim {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AssetClaim")
            .field("name", &self.asset.name)
            .finish()
    }
}
