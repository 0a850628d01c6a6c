//! Logging initialisation and the `Logger` capability
//!
//! All internal reporting goes through `tracing` macros with structured fields.
//! [`init`] installs a `tracing-subscriber` stack. A [`LogConfig`] starts from
//! plain defaults or from the run mode, and the environment overrides it:
//!
//! - `STRIP_LOG_LEVEL`: trace/debug/info/warn/error (default `info`); `RUST_LOG`
//!   takes precedence when set
//! - `STRIP_LOG_FORMAT`: `json` or `pretty` (default `pretty`)
//! - `STRIP_LOG_TARGET_FILTER`: extra comma separated directives
//! - `STRIP_LOG_INCLUDE_LOCATION`: include file and line
//!
//! The dispatch core does not log through the subscriber directly when it reports
//! request failures; it resolves a [`Logger`] from the request scope so that
//! applications can redirect those reports.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;

use crate::config::RunMode;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// `json` (any case) selects JSON, everything else pretty output.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Settings for [`init`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// trace/debug/info/warn/error; anything else means info
    pub level: String,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, comma separated
    pub directives: Option<String>,
    /// Emit file and line of each event
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
            directives: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Defaults overlaid with `STRIP_LOG_*`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().overlay_env()
    }

    /// Verbose, located, human readable output in dev; JSON at info elsewhere.
    #[must_use]
    pub fn for_run_mode(mode: RunMode) -> Self {
        if mode.is_dev() {
            Self {
                level: "debug".to_owned(),
                include_location: true,
                ..Self::default()
            }
        } else {
            Self {
                format: LogFormat::Json,
                ..Self::default()
            }
        }
    }

    /// Replace every field whose `STRIP_LOG_*` variable is set.
    #[must_use]
    pub fn overlay_env(mut self) -> Self {
        if let Ok(level) = env::var("STRIP_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("STRIP_LOG_FORMAT") {
            self.format = LogFormat::parse(&format);
        }
        if let Ok(directives) = env::var("STRIP_LOG_TARGET_FILTER") {
            self.directives = Some(directives);
        }
        if let Some(location) = env::var("STRIP_LOG_INCLUDE_LOCATION")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.include_location = location;
        }
        self
    }

    fn max_level(&self) -> Level {
        self.level.trim().parse().unwrap_or(Level::INFO)
    }
}

fn env_filter(config: &LogConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.max_level().as_str()));
    let quiet_transport: Directive = "may_minihttp=warn".parse()?;
    filter = filter.add_directive(quiet_transport);

    let extra = config.directives.as_deref().unwrap_or_default();
    for directive in extra.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        let parsed: Directive = directive
            .parse()
            .with_context(|| format!("Invalid log directive `{directive}`"))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

/// Install the global subscriber.
///
/// # Errors
///
/// An invalid directive in [`LogConfig::directives`], or a global subscriber
/// that is already installed (tests that may initialise twice can ignore it).
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let fmt = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location);
    let layer = match config.format {
        LogFormat::Json => fmt.json().with_current_span(true).with_thread_ids(true).boxed(),
        LogFormat::Pretty => fmt.pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

/// Reporting capability resolved by the dispatch core.
///
/// Provided as `dyn Logger` in the application scope; replace it with
/// `App::set_logger`.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }
}

/// [`Logger`] that forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "strip", "{message}"),
            Level::WARN => tracing::warn!(target: "strip", "{message}"),
            Level::INFO => tracing::info!(target: "strip", "{message}"),
            Level::DEBUG => tracing::debug!(target: "strip", "{message}"),
            _ => tracing::trace!(target: "strip", "{message}"),
        }
    }
}
