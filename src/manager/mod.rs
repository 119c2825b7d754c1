//! The registry of assets, the loader chain and the three loading APIs.
//!
//! # Loading
//!
//! Every request goes through the same steps: the manager finds or creates the `Asset` of the
//! name, and whoever wins its loading claim offers it to each registered `Loader` in order. All
//! other requests of the same name attach to the one in-flight load, so a name is loaded at most
//! once no matter how many threads ask for it.
//!
//! 1. `load_sync` runs the loader chain on the calling thread, and blocks until the asset is
//! terminal. It never touches the worker pool.
//! 2. `load_future` does the same on a worker thread and returns a `LoadFuture`.
//! 3. `load_async` schedules the load on a worker thread and reports through callbacks.
//!
//! Since `load_future` and `load_async` block a worker for the whole load, a loader that issues
//! nested `load_future` requests could starve the pool if every worker ends up waiting on jobs
//! queued behind it. Loaders should use `load_sync` for nested requests.
//!
//! # Eviction
//!
//! Ready assets stay cached until `sweep` runs. A sweep drops every asset that is referenced by
//! the registry only; assets held by any caller are never evicted.

pub mod future;
pub mod params;

pub use self::future::LoadFuture;
pub use self::params::ManagerParams;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::asset::{Asset, AssetClaim};
use crate::async_state::AsyncState;
use crate::buffer::Buffer;
use crate::errors::*;
use crate::loader::{Declined, Loader};
use crate::promise::Promise;
use crate::sched::{unwind, WorkerPool};

/// An opaque handle of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

type Listener = Arc<dyn Fn(&str, &Result<Buffer>) + Send + Sync + 'static>;

#[derive(Default)]
struct Listeners {
    list: RwLock<Vec<(ListenerHandle, Listener)>>,
}

impl Listeners {
    fn notify(&self, name: &str, result: &Result<Buffer>) {
        // Listeners run without the lock held, so they may (un)register listeners themselves.
        let snapshot: Vec<_> = self
            .list
            .read()
            .unwrap()
            .iter()
            .map(|v| v.1.clone())
            .collect();

        for listener in snapshot {
            if let Err(err) = unwind::halt_unwinding(|| (*listener)(name, result)) {
                warn!("Asset listener panicked: {}", unwind::panic_message(&err));
            }
        }
    }
}

struct ManagerShared {
    registry: RwLock<HashMap<String, Arc<Asset>>>,
    loaders: RwLock<Vec<Arc<dyn Loader>>>,
    listeners: Arc<Listeners>,
    next_listener: AtomicU64,
}

impl ManagerShared {
    fn find_or_insert(&self, name: &str) -> Arc<Asset> {
        if let Some(asset) = self.registry.read().unwrap().get(name) {
            return asset.clone();
        }

        let mut registry = self.registry.write().unwrap();
        if let Some(asset) = registry.get(name) {
            return asset.clone();
        }

        let asset = Arc::new(Asset::new(name));

        let listeners = self.listeners.clone();
        let key = name.to_owned();
        asset.on_ready(move |result| listeners.notify(&key, result));

        registry.insert(name.to_owned(), asset.clone());
        debug!("Asset {} registered.", name);
        asset
    }

    /// Offers `claim` to every loader in registration order.
    fn run_loaders(&self, claim: AssetClaim) {
        let loaders = self.loaders.read().unwrap().clone();
        let name = claim.name().to_owned();

        let mut claim = claim;
        for loader in loaders {
            match loader.load(claim) {
                Ok(()) => return,
                Err(Declined { claim: declined, reason }) => {
                    if !reason.is_recoverable() {
                        warn!("Loader failed on {}. {}", name, reason);
                        declined.complete(Err(reason));
                        return;
                    }

                    debug!("Loader passed on {}. {}", name, reason);
                    claim = declined;
                }
            }
        }

        claim.complete(Err(Error::NotFound(format!("{} (no loader found)", name))));
    }

    /// Runs the loader chain of `asset` if nobody else did. Panics of loaders are caught, the
    /// abandoned claim fails the asset.
    fn drive(&self, asset: &Arc<Asset>) {
        if let Some(claim) = asset.try_claim() {
            if let Err(err) = unwind::halt_unwinding(|| self.run_loaders(claim)) {
                warn!(
                    "Loader panicked on {}: {}",
                    asset.name(),
                    unwind::panic_message(&err)
                );
            }
        }
    }
}

/// The registry of assets.
pub struct AssetManager {
    shared: Arc<ManagerShared>,
    pool: WorkerPool,
}

impl AssetManager {
    /// Creates a manager with its own worker pool.
    pub fn new(params: ManagerParams) -> Result<Self> {
        let pool = WorkerPool::new(
            params.worker_count(),
            params.stack_size,
            &params.thread_name,
        )?;

        let shared = Arc::new(ManagerShared {
            registry: RwLock::new(HashMap::new()),
            loaders: RwLock::new(Vec::new()),
            listeners: Arc::new(Listeners::default()),
            next_listener: AtomicU64::new(1),
        });

        Ok(AssetManager { shared, pool })
    }

    /// Appends `loader` to the loader chain.
    pub fn add_loader<L: Loader>(&self, loader: Arc<L>) {
        let mut loaders = self.shared.loaders.write().unwrap();
        loaders.push(loader);
        info!("Loader registered, {} loaders in the chain.", loaders.len());
    }

    /// Removes every loader. Loads in flight finish with the chain they started with.
    pub fn clear_loaders(&self) {
        self.shared.loaders.write().unwrap().clear();
        info!("Loader chain cleared.");
    }

    /// The number of registered loaders.
    pub fn loaders_len(&self) -> usize {
        self.shared.loaders.read().unwrap().len()
    }

    /// Loads `name` on the calling thread, or waits for the load already in flight.
    pub fn load_sync(&self, name: &str) -> Result<Buffer> {
        let asset = self.shared.find_or_insert(name);
        self.shared.drive(&asset);
        asset.wait()
    }

    /// Loads `name` on a worker thread.
    pub fn load_future(&self, name: &str) -> LoadFuture {
        let asset = self.shared.find_or_insert(name);
        let promise = Arc::new(Promise::new());

        if let Some(result) = asset.result() {
            promise.set(result);
            return LoadFuture::new(name.to_owned(), promise);
        }

        let shared = self.shared.clone();
        let fulfill = promise.clone();
        self.pool.spawn(move || {
            shared.drive(&asset);
            fulfill.set(asset.wait());
        });

        LoadFuture::new(name.to_owned(), promise)
    }

    /// Loads `name` on a worker thread, then runs `on_success` or `on_error` on whatever thread
    /// completed it. Both run right away on the calling thread if the asset is terminal already.
    pub fn load_async<F1, F2>(&self, name: &str, on_success: F1, on_error: F2) -> Arc<Asset>
    where
        F1: FnOnce(&Buffer) + Send + 'static,
        F2: FnOnce(&Error) + Send + 'static,
    {
        let asset = self.shared.find_or_insert(name);
        asset.run_when_ready(on_success, on_error);

        if asset.state() == AsyncState::Initial {
            let shared = self.shared.clone();
            let target = asset.clone();
            self.pool.spawn(move || shared.drive(&target));
        }

        asset
    }

    /// Pins the load unit `name` in every loader that supports load units. Returns false if
    /// none does.
    pub fn pin_load_unit(&self, name: &str) -> bool {
        let loaders = self.shared.loaders.read().unwrap().clone();
        loaders
            .iter()
            .fold(false, |pinned, v| v.pin_load_unit(name) || pinned)
    }

    /// Unpins the load unit `name` in every loader that supports load units.
    pub fn unpin_load_unit(&self, name: &str) -> bool {
        let loaders = self.shared.loaders.read().unwrap().clone();
        loaders
            .iter()
            .fold(false, |unpinned, v| v.unpin_load_unit(name) || unpinned)
    }

    /// Drops every asset nobody but the registry refers to. Returns the number of evicted
    /// assets.
    pub fn sweep(&self) -> usize {
        let mut registry = self.shared.registry.write().unwrap();
        let len = registry.len();
        registry.retain(|_, v| Arc::strong_count(v) > 1);

        let evicted = len - registry.len();
        if evicted > 0 {
            debug!("Swept {} assets, {} left.", evicted, registry.len());
        }

        evicted
    }

    /// Registers `func`, which runs every time an asset of this manager becomes ready or fails.
    pub fn add_listener<F>(&self, func: F) -> ListenerHandle
    where
        F: Fn(&str, &Result<Buffer>) + Send + Sync + 'static,
    {
        let handle = ListenerHandle(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(func);
        self.shared
            .listeners
            .list
            .write()
            .unwrap()
            .push((handle, listener));

        handle
    }

    /// Unregisters a listener. Returns false if `handle` is unknown.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut list = self.shared.listeners.list.write().unwrap();
        let len = list.len();
        list.retain(|v| v.0 != handle);
        list.len() != len
    }

    /// The number of cached assets.
    pub fn len(&self) -> usize {
        self.shared.registry.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shared.registry.read().unwrap().contains_key(name)
    }

    /// The state of the cached asset `name`.
    pub fn state(&self, name: &str) -> Option<AsyncState> {
        self.get(name).map(|v| v.state())
    }

    /// Returns the cached asset `name` without loading it.
    pub fn get(&self, name: &str) -> Option<Arc<Asset>> {
        self.shared.registry.read().unwrap().get(name).cloned()
    }

    /// The number of worker threads.
    #[inline]
    pub fn workers(&self) -> usize {
        self.pool.len()
    }
}
