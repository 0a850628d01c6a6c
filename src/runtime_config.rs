//! # Runtime Configuration Module
//!
//! Environment based settings for the `may` coroutine runtime that serves
//! requests.
//!
//! ## Environment Variables
//!
//! ### `STRIP_STACK_SIZE`
//!
//! Stack size for request coroutines. Accepts decimal (`16384`) or hexadecimal
//! (`0x4000`). Default: `0x4000` (16 KB).
//!
//! Filter chains recurse through `Next::run`, so deep chains with large handler
//! frames may need `0x8000` or more.
//!
//! ### `STRIP_WORKERS`
//!
//! Number of scheduler worker threads. Default: available parallelism.
//!
//! ## Usage
//!
//! ```rust
//! use strip::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;

const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes (default: 16 KB / 0x4000)
    pub stack_size: usize,
    /// Scheduler worker threads
    pub workers: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_values(
            env::var("STRIP_STACK_SIZE").ok().as_deref(),
            env::var("STRIP_WORKERS").ok().as_deref(),
        )
    }

    fn from_values(stack_size: Option<&str>, workers: Option<&str>) -> Self {
        let stack_size = match stack_size {
            Some(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(DEFAULT_STACK_SIZE)
                } else {
                    val.parse().unwrap_or(DEFAULT_STACK_SIZE)
                }
            }
            None => DEFAULT_STACK_SIZE,
        };
        let workers = workers
            .and_then(|w| w.parse().ok())
            .filter(|w| *w > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));
        RuntimeConfig {
            stack_size,
            workers,
        }
    }

    /// Apply to the global `may` configuration. Call before starting a server.
    pub fn apply(&self) {
        may::config()
            .set_stack_size(self.stack_size)
            .set_workers(self.workers);
    }
}
