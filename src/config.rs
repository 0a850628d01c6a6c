//! Sectioned configuration.
//!
//! Keys are addressed as `"key"` (default section) or `"section::key"`. A
//! [`Config`] answers from, in order:
//!
//! 1. the environment (`STRIP_<SECTION>_<KEY>`, section omitted for the default
//!    section, upper-cased, anything not alphanumeric replaced by `_`)
//! 2. its own data, usually loaded from TOML
//! 3. its parent [`Configer`], if any
//!
//! ```toml
//! run_mode = "prod"
//! http_port = 9000
//!
//! [redis]
//! addr = "127.0.0.1:6379"
//! pool.size = 8
//! ```
//!
//! gives `find("run_mode") == Some("prod")`, `find("redis::addr")` and
//! `find("redis::pool.size") == Some("8")`.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the section used for keys without a `section::` prefix.
pub const DEFAULT_SECTION: &str = "default";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "STRIP";

const SECTION_SEPARATOR: &str = "::";

/// Read access to sectioned configuration.
pub trait Configer: Send + Sync {
    /// Look up `"key"` or `"section::key"`.
    fn find(&self, name: &str) -> Option<String>;

    /// Copy of every key in `section`. Unknown sections are empty.
    fn list_section(&self, section: &str) -> HashMap<String, String>;
}

/// Split `"section::key"` into its parts; a bare key lives in the default section.
fn split_name(name: &str) -> (&str, &str) {
    match name.split_once(SECTION_SEPARATOR) {
        Some((section, key)) if !section.is_empty() => (section, key),
        Some((_, key)) => (DEFAULT_SECTION, key),
        None => (DEFAULT_SECTION, name),
    }
}

/// Environment variable consulted for `section` / `key`.
///
/// `("redis", "pool.size")` → `STRIP_REDIS_POOL_SIZE`, `("default", "http_port")`
/// → `STRIP_HTTP_PORT`.
#[must_use]
pub fn env_key(prefix: &str, section: &str, key: &str) -> String {
    let mut raw = String::with_capacity(prefix.len() + section.len() + key.len() + 2);
    if !prefix.is_empty() {
        raw.push_str(prefix);
        raw.push('_');
    }
    if section != DEFAULT_SECTION {
        raw.push_str(section);
        raw.push('_');
    }
    raw.push_str(key);
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// TOML-backed [`Configer`] with environment overrides and an optional parent.
#[derive(Clone, Default)]
pub struct Config {
    sections: HashMap<String, HashMap<String, String>>,
    parent: Option<Arc<dyn Configer>>,
    env_prefix: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sections", &self.sections)
            .field("has_parent", &self.parent.is_some())
            .field("env_prefix", &self.env_prefix())
            .finish()
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML parse error.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = toml::from_str(text)?;
        let mut config = Self::new();
        for (key, value) in table {
            match value {
                toml::Value::Table(inner) => {
                    let section = config.sections.entry(key).or_default();
                    flatten_into(section, "", inner);
                }
                scalar => {
                    if let Some(text) = scalar_to_string(&scalar) {
                        config
                            .sections
                            .entry(DEFAULT_SECTION.to_owned())
                            .or_default()
                            .insert(key, text);
                    }
                }
            }
        }
        Ok(config)
    }

    /// Load a TOML file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(
            path = %path.display(),
            sections = config.sections.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Fall back to `parent` for keys this config does not know.
    #[must_use]
    pub fn with_parent(mut self, parent: Arc<dyn Configer>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn set_parent(&mut self, parent: Arc<dyn Configer>) {
        self.parent = Some(parent);
    }

    /// Replace the environment prefix (default `STRIP`). An empty prefix reads
    /// plain `SECTION_KEY` variables.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Set `"key"` or `"section::key"` in this config's own data.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let (section, key) = split_name(name);
        self.sections
            .entry(section.to_owned())
            .or_default()
            .insert(key.to_owned(), value.into());
    }

    /// Parse the value of `name` as `T`.
    ///
    /// Returns `None` when the key is missing or does not parse.
    #[must_use]
    pub fn get<T: FromStr>(&self, name: &str) -> Option<T> {
        self.find(name)?.parse().ok()
    }

    fn env_prefix(&self) -> &str {
        self.env_prefix.as_deref().unwrap_or(ENV_PREFIX)
    }
}

impl Configer for Config {
    fn find(&self, name: &str) -> Option<String> {
        let (section, key) = split_name(name);
        if let Ok(value) = std::env::var(env_key(self.env_prefix(), section, key)) {
            return Some(value);
        }
        if let Some(value) = self.sections.get(section).and_then(|s| s.get(key)) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.find(name))
    }

    fn list_section(&self, section: &str) -> HashMap<String, String> {
        self.sections.get(section).cloned().unwrap_or_default()
    }
}

fn flatten_into(section: &mut HashMap<String, String>, prefix: &str, table: toml::Table) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten_into(section, &full, inner),
            scalar => {
                if let Some(text) = scalar_to_string(&scalar) {
                    section.insert(full, text);
                }
            }
        }
    }
}

/// Strings are taken verbatim, arrays are comma-joined, nested tables inside
/// arrays are skipped.
fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        toml::Value::Table(_) => None,
    }
}

/// Deployment mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Dev,
    Prod,
    Test,
}

impl RunMode {
    #[must_use]
    pub fn is_dev(self) -> bool {
        self == RunMode::Dev
    }

    #[must_use]
    pub fn is_prod(self) -> bool {
        self == RunMode::Prod
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Dev => "dev",
            RunMode::Prod => "prod",
            RunMode::Test => "test",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a run mode string is not `dev`, `prod` or `test`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRunMode(pub String);

impl fmt::Display for InvalidRunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown run mode `{}`", self.0)
    }
}

impl std::error::Error for InvalidRunMode {}

impl FromStr for RunMode {
    type Err = InvalidRunMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(RunMode::Dev),
            "prod" | "production" => Ok(RunMode::Prod),
            "test" => Ok(RunMode::Test),
            _ => Err(InvalidRunMode(s.to_owned())),
        }
    }
}

/// Settings the application shell itself reads.
///
/// Provided into the root injector; handlers can take `Arc<AppConfig>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub run_mode: RunMode,
    pub http_addr: String,
    pub http_port: u16,
    /// Requests with a larger body are rejected by the transport adapter
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::Dev,
            http_addr: "0.0.0.0".to_owned(),
            http_port: 8080,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Bind from `run_mode`, `http_addr`, `http_port` and `max_body_bytes`.
    ///
    /// Missing keys keep their default; unparsable values are logged and
    /// ignored.
    #[must_use]
    pub fn from_configer(config: &dyn Configer) -> Self {
        let mut out = Self::default();
        bind(config, "run_mode", &mut out.run_mode);
        if let Some(addr) = config.find("http_addr") {
            out.http_addr = addr;
        }
        bind(config, "http_port", &mut out.http_port);
        bind(config, "max_body_bytes", &mut out.max_body_bytes);
        out
    }

    /// `http_addr:http_port`
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.http_addr, self.http_port)
    }
}

fn bind<T>(config: &dyn Configer, key: &str, slot: &mut T)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(raw) = config.find(key) else {
        return;
    };
    match raw.parse() {
        Ok(value) => *slot = value,
        Err(err) => warn!(key, value = %raw, error = %err, "Ignoring invalid config value"),
    }
}
