//! A fixed-size pool of worker threads draining one shared job queue.
//!
//! All suspension is done with blocking mutex/condition-variable waits, there is no cooperative
//! runtime underneath. Jobs that panic are caught and logged, they never take a worker down.

pub mod unwind;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crossbeam_deque::{Injector, Steal};

use crate::errors::*;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    shared: Arc<Shared>,
    threads: Vec<thread::JoinHandle<()>>,
}

struct Shared {
    injector: Injector<Job>,
    watcher: Watcher,
    terminated: AtomicBool,
}

struct Watcher(Mutex<()>, Condvar);

impl Watcher {
    fn notify_one(&self) {
        let _guard = self.0.lock().unwrap();
        self.1.notify_one();
    }

    fn notify_all(&self) {
        let _guard = self.0.lock().unwrap();
        self.1.notify_all();
    }
}

impl WorkerPool {
    /// Spawns `num` worker threads. At least one worker is always spawned.
    pub fn new(num: usize, stack_size: Option<usize>, name: &str) -> Result<Self> {
        let shared = Arc::new(Shared {
            injector: Injector::new(),
            watcher: Watcher(Mutex::new(()), Condvar::new()),
            terminated: AtomicBool::new(false),
        });

        let mut pool = WorkerPool {
            shared,
            threads: Vec::new(),
        };

        for i in 0..num.max(1) {
            let mut b = thread::Builder::new().name(format!("{}-{}", name, i));
            if let Some(stack_size) = stack_size {
                b = b.stack_size(stack_size);
            }

            let shared = pool.shared.clone();
            let handle = b
                .spawn(move || WorkerPool::main_loop(&shared))
                .map_err(|err| Error::IO(format!("failed to spawn worker thread. {}", err)))?;

            pool.threads.push(handle);
        }

        info!("Worker pool spawned with {} threads.", pool.threads.len());
        Ok(pool)
    }

    /// The number of worker threads.
    #[inline]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Pushes a job into the shared queue, it will be taken by whatever worker has nothing to do.
    pub fn spawn<F>(&self, func: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.injector.push(Box::new(func));
        self.shared.watcher.notify_one();
    }

    /// Signals the workers to exit once the queue is drained, and blocks until they did.
    pub fn terminate(&mut self) {
        self.shared.terminated.store(true, Ordering::SeqCst);
        self.shared.watcher.notify_all();

        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("Worker thread exited abnormally.");
            }
        }
    }

    fn main_loop(shared: &Shared) {
        loop {
            match shared.injector.steal() {
                Steal::Success(job) => {
                    if let Err(err) = unwind::halt_unwinding(job) {
                        warn!("Job panicked on worker thread: {}", unwind::panic_message(&err));
                    }
                }
                Steal::Retry => continue,
                Steal::Empty => {
                    let guard = shared.watcher.0.lock().unwrap();

                    // Checks again under the lock, `spawn` notifies while holding it.
                    if !shared.injector.is_empty() {
                        continue;
                    }

                    if shared.terminated.load(Ordering::SeqCst) {
                        return;
                    }

                    let _guard = shared.watcher.1.wait(guard).unwrap();
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.terminate();
    }
}
