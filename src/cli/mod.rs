//! # CLI Module
//!
//! Command-line front end of the `strip` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Serve the demo application:
//!
//! ```bash
//! strip serve --addr 0.0.0.0:8080 --config app.toml
//! ```
//!
//! - `--addr <ADDR>` - listen address; defaults to `http_addr:http_port` from the config
//! - `--config <FILE>` - TOML configuration (see [`Config`](crate::config::Config))
//!
//! SIGTERM and SIGINT stop the listener on unix.
//!
//! ### `routes`
//!
//! Print the demo route table, one `METHOD TEMPLATE` pair per line:
//!
//! ```bash
//! strip routes
//! ```
//!
//! Logging is configured from `STRIP_LOG_LEVEL` / `STRIP_LOG_FORMAT`, the
//! coroutine runtime from `STRIP_STACK_SIZE` / `STRIP_WORKERS`.

mod commands;
mod demo;


pub use commands::{run_cli, Cli, Commands};
pub use demo::demo_app;
