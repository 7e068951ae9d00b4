//! Configuration loading for tortlens.
//! Reads tortlens.toml from the current directory or the path in TORTLENS_CONFIG.
//! A missing file is not an error: every setting has a default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tortlens_common::http::RetryPolicy;
use tortlens_ingestion::pagination::PaginationConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub openfda: OpenFdaConfig,
    #[serde(default)]
    pub courtlistener: CourtListenerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64    { 30 }
fn default_user_agent()   -> String { tortlens_common::http::DEFAULT_USER_AGENT.to_string() }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenFdaConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_openfda_delay_ms")]
    pub delay_ms: u64,
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default = "default_max_skip")]
    pub max_skip: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_page_size()        -> usize { 100 }
fn default_openfda_delay_ms() -> u64   { 250 }
fn default_max_skip()         -> usize { 25_000 }
fn default_retry_base_ms()    -> u64   { 2_000 }

impl Default for OpenFdaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            page_size: default_page_size(),
            delay_ms: default_openfda_delay_ms(),
            max_pages: None,
            max_skip: default_max_skip(),
            max_retries: 0,
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

impl OpenFdaConfig {
    pub fn pagination(&self) -> PaginationConfig {
        PaginationConfig {
            // openFDA caps `limit` at 100 per request
            page_size: self.page_size.clamp(1, 100),
            max_pages: self.max_pages,
            delay: Duration::from_millis(self.delay_ms),
            max_skip: Some(self.max_skip),
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtListenerConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_courtlistener_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_courtlistener_max_pages")]
    pub max_pages: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_courtlistener_delay_ms()  -> u64   { 1_000 }
fn default_courtlistener_max_pages() -> usize { 10 }

impl Default for CourtListenerConfig {
    fn default() -> Self {
        Self {
            token: None,
            delay_ms: default_courtlistener_delay_ms(),
            max_pages: default_courtlistener_max_pages(),
            max_retries: 0,
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

impl CourtListenerConfig {
    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir() }
    }
}

impl OutputConfig {
    /// Relative paths land under `dir`; absolute paths are used as given.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.starts_with(&self.dir) {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }
}


impl Config {
    /// Load configuration from `explicit`, else TORTLENS_CONFIG, else
    /// ./tortlens.toml. Secrets left empty in the file are taken from the
    /// environment.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(
                std::env::var("TORTLENS_CONFIG").unwrap_or_else(|_| "tortlens.toml".to_string()),
            ),
        };

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
            tracing::info!(path = %path.display(), "Configuration loaded");
            config
        } else if explicit.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        } else {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let is_blank = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").is_empty();
        if is_blank(&self.openfda.api_key) {
            self.openfda.api_key = lookup("TORTLENS_OPENFDA_API_KEY").filter(|v| !v.trim().is_empty());
        }
        if is_blank(&self.courtlistener.token) {
            self.courtlistener.token = lookup("TORTLENS_COURTLISTENER_TOKEN").filter(|v| !v.trim().is_empty());
        }
    }
}
