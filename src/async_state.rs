//! The asynchronous state machine shared by assets and both loading phases of load units.
//!
//! ```text
//! Initial --(try_claim)--> Loading --(complete Ok)--> Ready
//!                                  --(complete Err)--> Error
//! ```
//!
//! Only the thread that wins the `Initial -> Loading` compare-and-swap receives a `Claim`, and
//! only a `Claim` can write the result. Every other thread either blocks in `wait` or queues a
//! handler with `on_ready`. `Ready` and `Error` are terminal.

use std::mem;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use smallvec::SmallVec;

use crate::errors::*;
use crate::sched::unwind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncState {
    Initial,
    Loading,
    Ready,
    Error,
}

impl AsyncState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == AsyncState::Ready || self == AsyncState::Error
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => AsyncState::Initial,
            1 => AsyncState::Loading,
            2 => AsyncState::Ready,
            _ => AsyncState::Error,
        }
    }
}

type Handler<T> = Box<dyn FnOnce(&Result<T>) + Send + 'static>;

struct Inner<T> {
    result: Option<Result<T>>,
    handlers: SmallVec<[Handler<T>; 2]>,
    // Set while the completing thread still runs queued handlers. Late handlers are queued
    // behind them instead of running right away.
    draining: bool,
}

/// A write-once slot with an ownership claim, a condition variable and a handler queue.
pub struct AsyncCell<T> {
    state: AtomicU8,
    inner: Mutex<Inner<T>>,
    cond: Condvar,
}

impl<T: Clone + Send + 'static> AsyncCell<T> {
    pub fn new() -> Self {
        AsyncCell {
            state: AtomicU8::new(AsyncState::Initial as u8),
            inner: Mutex::new(Inner {
                result: None,
                handlers: SmallVec::new(),
                draining: false,
            }),
            cond: Condvar::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> AsyncState {
        AsyncState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Attempts the `Initial -> Loading` transition. Returns the claim to the single winner.
    pub fn try_claim(self: &Arc<Self>) -> Option<Claim<T>> {
        self.state
            .compare_exchange(
                AsyncState::Initial as u8,
                AsyncState::Loading as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| Claim {
                cell: Some(self.clone()),
            })
    }

    /// Returns the result if this cell is terminal already.
    pub fn try_get(&self) -> Option<Result<T>> {
        self.inner.lock().unwrap().result.clone()
    }

    /// Blocks current thread until this cell becomes terminal.
    pub fn wait(&self) -> Result<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(ref result) = inner.result {
                return result.clone();
            }

            inner = self.cond.wait(inner).unwrap();
        }
    }

    /// Runs `func` once this cell becomes terminal. If it is terminal already, `func` runs on the
    /// calling thread right away. Otherwise it is queued and runs later, in registration order,
    /// on the thread that completes the cell. Handlers registered while queued ones are still
    /// running are queued behind them. Panics escaping `func` are swallowed.
    pub fn on_ready<F>(&self, func: F)
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        let result = {
            let mut inner = self.inner.lock().unwrap();
            match inner.result.clone() {
                Some(result) if !inner.draining => result,
                _ => {
                    inner.handlers.push(Box::new(func));
                    return;
                }
            }
        };

        invoke(Box::new(func), &result);
    }

    fn complete(&self, result: Result<T>) {
        let (handlers, result) = {
            let mut inner = self.inner.lock().unwrap();
            debug_assert!(inner.result.is_none(), "async cell completed twice.");

            let state = if result.is_ok() {
                AsyncState::Ready
            } else {
                AsyncState::Error
            };

            inner.result = Some(result.clone());
            inner.draining = true;
            self.state.store(state as u8, Ordering::Release);
            self.cond.notify_all();

            (mem::replace(&mut inner.handlers, SmallVec::new()), result)
        };

        // Handlers run outside of the lock, they are free to query or wait on this cell again.
        let mut handlers = handlers;
        loop {
            for handler in handlers {
                invoke(handler, &result);
            }

            let mut inner = self.inner.lock().unwrap();
            if inner.handlers.is_empty() {
                inner.draining = false;
                return;
            }

            handlers = mem::replace(&mut inner.handlers, SmallVec::new());
        }
    }
}

impl<T: Clone + Send + 'static> Default for AsyncCell<T> {
    fn default() -> Self {
        AsyncCell::new()
    }
}

fn invoke<T>(handler: Handler<T>, result: &Result<T>) {
    if let Err(err) = unwind::halt_unwinding(move || handler(result)) {
        warn!("Completion handler panicked: {}", unwind::panic_message(&err));
    }
}

/// The exclusive right to complete an `AsyncCell`. Dropping a claim without completing it fails
/// the cell, so waiters never hang on an abandoned load.
pub struct Claim<T: Clone + Send + 'static> {
    cell: Option<Arc<AsyncCell<T>>>,
}

impl<T: Clone + Send + 'static> Claim<T> {
    /// Publishes the result and fires every queued handler.
    pub fn complete(mut self, result: Result<T>) {
        if let Some(cell) = self.cell.take() {
            cell.complete(result);
        }
    }
}

impl<T: Clone + Send + 'static> Drop for Claim<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            cell.complete(Err(Error::Logic("load abandoned before completion.".into())));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn claim_once() {
        let cell = Arc::new(AsyncCell::<u32>::new());
        assert_eq!(cell.state(), AsyncState::Initial);

        let claim = cell.try_claim().unwrap();
        assert!(cell.try_claim().is_none());
        assert_eq!(cell.state(), AsyncState::Loading);

        claim.complete(Ok(7));
        assert_eq!(cell.state(), AsyncState::Ready);
        assert!(cell.try_claim().is_none());
        assert_eq!(cell.wait(), Ok(7));
    }

    #[test]
    fn handlers_fifo() {
        let cell = Arc::new(AsyncCell::<u32>::new());
        let order = Arc::new(StdMutex::new(Vec::new()));

        for i in 0..4 {
            let order = order.clone();
            cell.on_ready(move |_| order.lock().unwrap().push(i));
        }

        cell.on_ready(|_| panic!("swallowed"));
        cell.try_claim().unwrap().complete(Ok(1));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);

        // Runs immediately once terminal.
        let order2 = order.clone();
        cell.on_ready(move |v| order2.lock().unwrap().push(*v.as_ref().unwrap()));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 1]);
    }

    #[test]
    fn late_handlers_wait_for_queued_ones() {
        let cell = Arc::new(AsyncCell::<u32>::new());
        let order = Arc::new(StdMutex::new(Vec::new()));

        {
            let order = order.clone();
            cell.on_ready(move |_| {
                thread::sleep(Duration::from_millis(200));
                order.lock().unwrap().push(1);
            });
        }

        let claim = cell.try_claim().unwrap();
        let completer = thread::spawn(move || claim.complete(Ok(0)));

        while cell.try_get().is_none() {
            thread::yield_now();
        }

        {
            let order = order.clone();
            cell.on_ready(move |_| order.lock().unwrap().push(2));
        }

        completer.join().unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);

        // Once drained, handlers run on the calling thread again.
        let order2 = order.clone();
        cell.on_ready(move |_| order2.lock().unwrap().push(3));
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn abandoned_claim() {
        let cell = Arc::new(AsyncCell::<u32>::new());
        let claim = cell.try_claim().unwrap();

        let waiter = {
            let cell = cell.clone();
            thread::spawn(move || cell.wait())
        };

        drop(claim);
        assert_eq!(cell.state(), AsyncState::Error);
        match waiter.join().unwrap() {
            Err(Error::Logic(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
