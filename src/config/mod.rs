//! Typed configuration from environment variables and an optional TOML file.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! The store URL is wrapped in secrecy::SecretString since it may carry a
//! password.

pub mod secrets;

use crate::error::{Error, Result};
use crate::filter::FilterConfig;
use crate::queue::{Discipline, QueueConfig};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_QUEUE_KEY: &str = "{group}:queue";
pub const DEFAULT_FILTER_KEY: &str = "{group}:dedup";

#[derive(Debug)]
pub struct Config {
    pub redis_url: SecretString,
    pub frontier: FrontierConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `FRONTIER_CONFIG` may point at a TOML file with a `[frontier]` table;
    /// individual environment variables override what it sets.
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let group = required_var("CRAWL_GROUP")?;
        let mut frontier = match std::env::var("FRONTIER_CONFIG") {
            Ok(path) => FrontierConfig::load(Path::new(&path))?,
            Err(_) => FrontierConfig::default(),
        };
        frontier.group = group;

        if let Ok(discipline) = std::env::var("QUEUE_DISCIPLINE") {
            frontier.discipline = discipline.parse()?;
        }
        if let Some(bit) = parsed_var("BLOOMFILTER_BIT")? {
            frontier.filter.bit = bit;
        }
        if let Some(hash_number) = parsed_var("BLOOMFILTER_HASH_NUMBER")? {
            frontier.filter.hash_number = hash_number;
        }
        frontier.validate()?;

        Ok(Self {
            redis_url: SecretString::from(required_var("REDIS_URL")?),
            frontier,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("bad value for {name}: {e}"))),
        Err(_) => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Frontier settings
// ---------------------------------------------------------------------------

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct FrontierFile {
    frontier: FrontierConfig,
}

/// Everything needed to open one frontier: where its keys live, how its
/// queue orders work, and how large its filter is.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Logical group (typically the crawl job name) namespacing the keys.
    pub group: String,
    /// Queue key template; `{group}` is replaced by the group name.
    pub queue_key: String,
    /// Filter key template; `{group}` is replaced by the group name.
    pub filter_key: String,
    pub discipline: Discipline,
    pub filter: FilterConfig,
    /// Poll interval for waiting priority pops, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            group: "default".to_string(),
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            filter_key: DEFAULT_FILTER_KEY.to_string(),
            discipline: Discipline::default(),
            filter: FilterConfig::default(),
            poll_interval_ms: 100,
        }
    }
}

impl FrontierConfig {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            ..Self::default()
        }
    }

    pub fn discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Parse a TOML document holding a `[frontier]` table.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FrontierFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("bad frontier config: {e}")))?;
        file.frontier.validate()?;
        Ok(file.frontier)
    }

    /// Load a TOML file holding a `[frontier]` table.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read frontier config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check the filter sizing and the poll interval.
    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved queue key for this group.
    pub fn queue_key(&self) -> String {
        self.queue_key.replace("{group}", &self.group)
    }

    /// Resolved filter key for this group.
    pub fn filter_key(&self) -> String {
        self.filter_key.replace("{group}", &self.group)
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
