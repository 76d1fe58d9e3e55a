//! Indexing configuration.
//!
//! Usable both as command line flags (flattened into a `clap` parser) and as
//! a TOML `[index]` table.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Deserializer};

pub const DEFAULT_BULK_SIZE: usize = 100;
pub const DEFAULT_BULK_TIMEOUT: Duration = Duration::from_millis(10);
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Args, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Index written to when a change carries no `_index` override
    /// (defaults to the database name)
    #[arg(long = "index", env = "FEED_INDEXER_INDEX")]
    #[serde(rename = "index")]
    pub name: Option<String>,

    /// Document type used when a change carries no `_type` override
    /// (defaults to the database name)
    #[arg(long = "type", env = "FEED_INDEXER_TYPE")]
    #[serde(rename = "type")]
    pub doc_type: Option<String>,

    /// Strip `_attachments` from documents before indexing
    #[arg(long)]
    pub ignore_attachments: bool,

    /// Number of actions after which a bulk request is sent
    #[arg(long, default_value_t = DEFAULT_BULK_SIZE)]
    pub bulk_size: usize,

    /// How long to wait for another change before sending a bulk request
    /// (e.g. "10ms", "1s")
    #[arg(long, default_value = "10ms", value_parser = parse_duration)]
    #[serde(deserialize_with = "deserialize_duration")]
    pub bulk_timeout: Duration,

    /// Pause after an unexpected error before the next round
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    #[serde(deserialize_with = "deserialize_duration")]
    pub error_backoff: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: None,
            doc_type: None,
            ignore_attachments: false,
            bulk_size: DEFAULT_BULK_SIZE,
            bulk_timeout: DEFAULT_BULK_TIMEOUT,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

impl IndexConfig {
    /// Fill the index name and type from the database name where unset.
    pub fn for_database(mut self, database: &str) -> Self {
        self.name.get_or_insert_with(|| database.to_string());
        self.doc_type.get_or_insert_with(|| database.to_string());
        self
    }

    pub fn index_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn type_name(&self) -> &str {
        self.doc_type.as_deref().unwrap_or_default()
    }

    /// Load from the `[index]` table of a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        struct File {
            #[serde(default)]
            index: IndexConfig,
        }
        let file: File = toml::from_str(content)?;
        file.index.validate()
    }

    pub fn validate(self) -> anyhow::Result<Self> {
        if self.bulk_size == 0 {
            anyhow::bail!("bulk_size must be at least 1");
        }
        Ok(self)
    }
}

/// Parse a duration string like "10ms", "5s", "2m", "1h" or "250".
///
/// Plain numbers are interpreted as milliseconds.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let (num_str, unit_ms) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (s, 1)
    };

    let value: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration value: {s}"))?;
    value
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .with_context(|| format!("Duration out of range: {s}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => Ok(Duration::from_millis(ms)),
        Raw::Text(s) => parse_duration(&s).map_err(serde::de::Error::custom),
    }
}
