use std::thread;

use crate::errors::*;

/// Settings of an `AssetManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerParams {
    /// The number of worker threads serving `load_future` and `load_async`. Derived from the
    /// hardware concurrency if `None`.
    pub workers: Option<usize>,
    /// Workers per hardware thread when `workers` is `None`.
    pub worker_multiplier: usize,
    /// The stack size of worker threads, the platform default if `None`.
    pub stack_size: Option<usize>,
    /// Workers are named `<thread_name>-<index>`.
    pub thread_name: String,
}

impl Default for ManagerParams {
    fn default() -> Self {
        ManagerParams {
            workers: None,
            worker_multiplier: 2,
            stack_size: None,
            thread_name: "stockpile-worker".to_owned(),
        }
    }
}

impl ManagerParams {
    /// Parses settings from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| Error::Corrupt(format!("malformed manager params. {}", err)))
    }

    /// The number of worker threads to spawn, always at least one.
    pub fn worker_count(&self) -> usize {
        let num = match self.workers {
            Some(num) => num,
            None => {
                let hw = thread::available_parallelism()
                    .map(|v| v.get())
                    .unwrap_or(1);
                hw.saturating_mul(self.worker_multiplier)
            }
        };

        num.max(1)
    }
}
