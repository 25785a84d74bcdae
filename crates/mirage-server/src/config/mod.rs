//! Server configuration.
//!
//! Values come from an optional YAML file and are then overridden by CLI
//! flags in the binary.

mod listen;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use listen::{parse_listen_addr, MetricsConfig, DEFAULT_LISTEN};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Mock API listen address, `:port` or `host:port`.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory holding `<path>.json` endpoint definitions.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Root for `.js`, `.css`, `.jpg` and `.png` requests.
    #[serde(default = "default_dir")]
    pub static_dir: PathBuf,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Prometheus listener; disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,

    /// Time allowed for a client to send request headers.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_read_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            dir: default_dir(),
            static_dir: default_dir(),
            cache: CacheConfig::default(),
            metrics: None,
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let listen = parse_listen_addr(&self.listen)?;

        if let Some(metrics) = &self.metrics {
            let metrics_addr = parse_listen_addr(&metrics.listen)?;
            if metrics_addr.port() == listen.port() {
                anyhow::bail!(
                    "metrics listener `{}` uses the same port as the mock listener `{}`",
                    metrics.listen,
                    self.listen
                );
            }
        }

        if !self.dir.is_dir() {
            anyhow::bail!("definitions directory {} does not exist", self.dir.display());
        }

        if self.read_timeout_secs == 0 {
            anyhow::bail!("read_timeout_secs must be greater than zero");
        }

        Ok(())
    }
}
