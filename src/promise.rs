use std::sync::{Condvar, Mutex};

use crate::buffer::Buffer;
use crate::errors::*;

enum PromiseState<T> {
    NotReady,
    Ok(T),
    Taken,
}

/// A value that will be set by another thread. This is what `AssetManager::load_future` hands
/// out; the loading itself blocks on a worker thread, which fulfills the promise.
pub struct Promise<T = Result<Buffer>> {
    m: Mutex<PromiseState<T>>,
    v: Condvar,
}

impl<T> Promise<T> {
    #[inline]
    pub fn new() -> Self {
        Promise {
            m: Mutex::new(PromiseState::NotReady),
            v: Condvar::new(),
        }
    }

    #[inline]
    pub(crate) fn set(&self, v: T) {
        {
            let mut guard = self.m.lock().unwrap();
            *guard = PromiseState::Ok(v);
        }

        self.v.notify_all();
    }

    /// Returns true if the value has been set, and not taken yet.
    pub fn is_ready(&self) -> bool {
        match *self.m.lock().unwrap() {
            PromiseState::Ok(_) => true,
            _ => false,
        }
    }

    /// Takes the value if it has been set.
    pub fn try_take(&self) -> Option<T> {
        let mut guard = self.m.lock().unwrap();
        match *guard {
            PromiseState::Ok(_) => {}
            _ => return None,
        }

        match ::std::mem::replace(&mut *guard, PromiseState::Taken) {
            PromiseState::Ok(v) => Some(v),
            _ => None,
        }
    }

    /// Blocks current thread until the value is set, and takes it. Returns `None` if the value
    /// has been taken already.
    pub fn wait(&self) -> Option<T> {
        let mut guard = self.m.lock().unwrap();
        while let PromiseState::NotReady = *guard {
            guard = self.v.wait(guard).unwrap();
        }

        match ::std::mem::replace(&mut *guard, PromiseState::Taken) {
            PromiseState::Ok(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Promise::new()
    }
}
