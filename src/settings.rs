use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Runtime settings. Sources, later wins: built-in defaults, optional
/// `enricher.toml`, `ENRICH_*` environment variables, CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub store_path: PathBuf,
    pub log_path: PathBuf,
    pub fetch_timeout_secs: u64,
    pub item_delay_ms: u64,
    pub iteration_delay_ms: u64,
    pub max_iterations: u32,
    pub max_redirects: usize,
    pub max_body_bytes: usize,
    pub parse_timeout_secs: u64,
    pub user_agent: String,
    pub accept: String,
    pub retry_settled: bool,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::builder()?
            .add_source(File::with_name("enricher").required(false))
            .add_source(Environment::with_prefix("ENRICH"))
            .build()?
            .try_deserialize()
            .context("invalid enricher settings")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("store_path", "data/content.json")?
            .set_default("log_path", "data/enrich.log")?
            .set_default("fetch_timeout_secs", 30_i64)?
            .set_default("item_delay_ms", 2000_i64)?
            .set_default("iteration_delay_ms", 3000_i64)?
            .set_default("max_iterations", 10_i64)?
            .set_default("max_redirects", 5_i64)?
            .set_default("max_body_bytes", 5 * 1024 * 1024_i64)?
            .set_default("parse_timeout_secs", 10_i64)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("accept", DEFAULT_ACCEPT)?
            .set_default("retry_settled", true)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn iteration_delay(&self) -> Duration {
        Duration::from_millis(self.iteration_delay_ms)
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_secs(self.parse_timeout_secs)
    }
}

#[cfg(test)]
impl Settings {
    /// Defaults with every pause removed.
    pub fn for_tests(store_path: PathBuf, log_path: PathBuf) -> Self {
        let mut s: Settings = Self::builder()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        s.store_path = store_path;
        s.log_path = log_path;
        s.item_delay_ms = 0;
        s.iteration_delay_ms = 0;
        s
    }
}
