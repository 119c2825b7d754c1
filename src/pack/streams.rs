//! Pooled, reusable file handles keyed by path.
//!
//! Handles are lent out one at a time. When every pooled handle of a key is busy a new one is
//! opened instead of waiting, which trades file descriptors for latency under contention.

use std::collections::HashMap;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::errors::*;
use crate::stream::prelude::*;

struct Pooled {
    busy: AtomicBool,
    stream: Mutex<ReaderInput<fs::File>>,
}

impl Pooled {
    fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

#[derive(Default)]
pub struct StreamPool {
    streams: RwLock<HashMap<String, Vec<Arc<Pooled>>>>,
}

impl StreamPool {
    pub fn new() -> Self {
        StreamPool::default()
    }

    /// Lends out an idle stream of `path`, or opens a new one and adds it to the pool.
    pub fn acquire(&self, path: &str) -> Result<StreamLease> {
        {
            let streams = self.streams.read().unwrap();
            if let Some(list) = streams.get(path) {
                for v in list {
                    if v.try_acquire() {
                        return Ok(StreamLease { pooled: v.clone() });
                    }
                }
            }
        }

        let stream = ReaderInput::open(Path::new(path))?;
        let pooled = Arc::new(Pooled {
            busy: AtomicBool::new(true),
            stream: Mutex::new(stream),
        });

        self.streams
            .write()
            .unwrap()
            .entry(path.to_owned())
            .or_insert_with(Vec::new)
            .push(pooled.clone());

        debug!("Opened a new pooled stream for {}.", path);
        Ok(StreamLease { pooled })
    }

    /// The number of streams pooled for `path`.
    pub fn len(&self, path: &str) -> usize {
        self.streams
            .read()
            .unwrap()
            .get(path)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Drops every stream of `path` out of the pool. Idle streams are closed right away, leased
    /// ones once their lease is dropped; they are never handed out again.
    pub fn close(&self, path: &str) {
        if let Some(list) = self.streams.write().unwrap().remove(path) {
            debug!("Closed {} pooled streams for {}.", list.len(), path);
        }
    }
}

/// Exclusive access to a pooled stream, it goes back into the pool when dropped.
pub struct StreamLease {
    pooled: Arc<Pooled>,
}

impl StreamLease {
    /// Locks the stream. The lock is never contended, the lease is exclusive already.
    pub fn stream(&self) -> StreamGuard {
        let mut guard = self.pooled.stream.lock().unwrap();
        guard.clear();
        StreamGuard { guard }
    }
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.pooled.busy.store(false, Ordering::Release);
    }
}

pub struct StreamGuard<'a> {
    guard: MutexGuard<'a, ReaderInput<fs::File>>,
}

impl<'a> Deref for StreamGuard<'a> {
    type Target = ReaderInput<fs::File>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<'a> DerefMut for StreamGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
