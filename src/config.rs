// src/config.rs
//! Application configuration.
//!
//! Resolution order:
//! 1) `$DASHBOARD_CONFIG_PATH` (must exist if set)
//! 2) `config/dashboard.toml`
//! 3) built-in defaults
//!
//! followed by per-field env overrides (`DASHBOARD_*`). Numbers that fail to
//! parse, or are zero, fall back to the defaults.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::dashboard::{
    DashboardConfig, DEFAULT_HEADLINE_LIMIT, DEFAULT_KEYWORDS_TOP_N, DEFAULT_LABEL_MAX,
    DEFAULT_TOP_N,
};
use crate::editor::DEFAULT_PAGE_SIZE;
use crate::history::{MAX_TREND_DAYS, TREND_DAYS};
use crate::loader::Loader;
use crate::store::{FileStore, HeadlinesStore, MemoryStore};
use crate::topics::TopicTable;

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";

pub const ENV_STORE_DIR: &str = "DASHBOARD_STORE_DIR";
pub const ENV_DATA_URL: &str = "DASHBOARD_DATA_URL";
pub const ENV_TOP_N: &str = "DASHBOARD_TOP_N";
pub const ENV_PAGE_SIZE: &str = "DASHBOARD_PAGE_SIZE";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "DASHBOARD_FETCH_TIMEOUT_SECS";
pub const ENV_TOPICS_PATH: &str = "DASHBOARD_TOPICS_PATH";

fn default_data_url() -> String {
    "http://127.0.0.1:8000/data/".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for the file-backed store; `None` keeps data in memory.
    pub store_dir: Option<PathBuf>,
    /// Base URL serving `latest.json` and `history.json`.
    pub data_url: String,
    pub top_n: usize,
    pub headline_limit: usize,
    pub keywords_top_n: usize,
    pub trend_days: usize,
    pub page_size: usize,
    pub fetch_timeout_secs: u64,
    /// Optional TOML topic table replacing the built-in one.
    pub topics_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            data_url: default_data_url(),
            top_n: DEFAULT_TOP_N,
            headline_limit: DEFAULT_HEADLINE_LIMIT,
            keywords_top_n: DEFAULT_KEYWORDS_TOP_N,
            trend_days: TREND_DAYS,
            page_size: DEFAULT_PAGE_SIZE,
            fetch_timeout_secs: 10,
            topics_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing dashboard config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// File (env path → default path → defaults), then env overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_nonempty(ENV_STORE_DIR) {
            self.store_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env_nonempty(ENV_DATA_URL) {
            self.data_url = v;
        }
        if let Some(v) = env_parse(ENV_TOP_N) {
            self.top_n = v;
        }
        if let Some(v) = env_parse(ENV_PAGE_SIZE) {
            self.page_size = v;
        }
        if let Some(v) = env_parse(ENV_FETCH_TIMEOUT_SECS) {
            self.fetch_timeout_secs = v;
        }
        if let Some(v) = env_nonempty(ENV_TOPICS_PATH) {
            self.topics_path = Some(PathBuf::from(v));
        }
    }

    fn sanitize(&mut self) {
        let d = Self::default();
        if self.top_n == 0 {
            self.top_n = d.top_n;
        }
        if self.headline_limit == 0 {
            self.headline_limit = d.headline_limit;
        }
        if self.keywords_top_n == 0 {
            self.keywords_top_n = d.keywords_top_n;
        }
        if self.trend_days == 0 {
            self.trend_days = d.trend_days;
        }
        self.trend_days = self.trend_days.min(MAX_TREND_DAYS);
        if self.page_size == 0 {
            self.page_size = d.page_size;
        }
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = d.fetch_timeout_secs;
        }
        if self.data_url.trim().is_empty() {
            self.data_url = d.data_url;
        }
    }

    pub fn dashboard(&self) -> DashboardConfig {
        DashboardConfig {
            top_n: self.top_n,
            headline_limit: self.headline_limit,
            keywords_top_n: self.keywords_top_n,
            trend_days: self.trend_days,
            label_max: DEFAULT_LABEL_MAX,
        }
    }

    pub fn loader(&self) -> Loader {
        Loader::new(self.data_url.clone()).with_timeout(self.fetch_timeout_secs)
    }

    pub fn topic_table(&self) -> Result<TopicTable> {
        match &self.topics_path {
            Some(p) => TopicTable::load_from_file(p),
            None => Ok(TopicTable::default()),
        }
    }

    pub fn headlines_store(&self) -> HeadlinesStore {
        match &self.store_dir {
            Some(dir) => HeadlinesStore::new(Arc::new(FileStore::new(dir.clone()))),
            None => HeadlinesStore::new(Arc::new(MemoryStore::new())),
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env_nonempty(name).and_then(|v| v.parse().ok())
}
