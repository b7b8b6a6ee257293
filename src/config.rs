//! Configuration loaded from `servertail.toml`.
//!
//! Every field has a default, so a missing file or a partial one is fine.
//! Command line flags are applied on top by `main`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use servertail_logs::{
    DEFAULT_INITIAL_LINES, DEFAULT_INITIAL_MAX_BYTES, DEFAULT_INTERNAL_RETENTION,
    DEFAULT_NOISE_PATTERNS, DEFAULT_POLL_INTERVAL, DEFAULT_RETENTION, IncrementalReader,
    NoiseFilter, SourceRegistry, TailOptions,
};

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "servertail.toml";

/// Id of the game server console source
pub const CONSOLE_SOURCE: &str = "console";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub poll_interval_ms: u64,

    /// Lines kept from the first read of a file
    pub initial_lines: usize,

    /// Bytes read from the end of a file on the first read
    pub initial_max_bytes: u64,

    /// Console lines kept in memory
    pub retention: usize,

    /// Internal log records kept in memory
    pub internal_retention: usize,

    /// Regexes for lines hidden by the noise filter
    pub noise_patterns: Vec<String>,

    /// `EnvFilter` directive, `RUST_LOG` wins when set
    pub log_filter: String,

    /// Log files by source id
    pub sources: BTreeMap<String, PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut sources = BTreeMap::new();
        sources.insert(CONSOLE_SOURCE.to_string(), PathBuf::from("server-console.txt"));

        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            initial_lines: DEFAULT_INITIAL_LINES,
            initial_max_bytes: DEFAULT_INITIAL_MAX_BYTES,
            retention: DEFAULT_RETENTION,
            internal_retention: DEFAULT_INTERNAL_RETENTION,
            noise_patterns: DEFAULT_NOISE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            log_filter: "info".to_string(),
            sources,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] when it exists.
    /// An explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;

        // A sources table without the console keeps the default console path
        if !config.sources.contains_key(CONSOLE_SOURCE)
            && let Some(default) = Self::default().sources.remove(CONSOLE_SOURCE)
        {
            config.sources.insert(CONSOLE_SOURCE.to_string(), default);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than 0");
        }
        if self.retention == 0 || self.internal_retention == 0 {
            bail!("retention sizes must be greater than 0");
        }
        if !self.sources.contains_key(CONSOLE_SOURCE) {
            bail!("no '{CONSOLE_SOURCE}' source configured");
        }
        Ok(())
    }

    pub fn console_path(&self) -> Result<&Path> {
        self.sources
            .get(CONSOLE_SOURCE)
            .map(PathBuf::as_path)
            .with_context(|| format!("no '{CONSOLE_SOURCE}' source configured"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn tail_options(&self) -> TailOptions {
        TailOptions {
            poll_interval: self.poll_interval(),
            initial_lines: self.initial_lines,
            initial_max_bytes: self.initial_max_bytes,
            retention: self.retention,
        }
    }

    pub fn registry(&self) -> SourceRegistry {
        self.sources.iter().map(|(id, path)| (id.as_str(), path.as_path())).collect()
    }

    pub fn reader(&self) -> IncrementalReader {
        IncrementalReader::new(self.initial_max_bytes)
    }

    pub fn noise_filter(&self) -> Result<NoiseFilter> {
        NoiseFilter::new(&self.noise_patterns).context("invalid noise_patterns")
    }
}
