//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pulsedeck/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pulsedeck/` (~/.config/pulsedeck/)
//! - State/Logs: `$XDG_STATE_HOME/pulsedeck/` (~/.local/state/pulsedeck/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Remote event store connection and paging
    #[serde(default)]
    pub store: StoreConfig,

    /// Event classification tables (content / module / paywall)
    #[serde(default)]
    pub categories: CategoryConfig,

    /// URL-label normalization (known-platform host collapse)
    #[serde(default)]
    pub urls: UrlConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote event store configuration
///
/// The store is an external collaborator: pulsedeck only issues
/// time-range + exact-match filtered, offset/limit paged reads.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Store base URL (e.g., `https://events.example.com`)
    pub base_url: Option<String>,

    /// Dataset identifier scoping every query
    pub dataset: Option<String>,

    /// API key for bearer auth (can also use env var)
    pub api_key: Option<String>,

    /// Rows per page (max 1000, default 500)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Hard cap on total rows per fetch; hitting it raises the
    /// truncation flag instead of failing
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Concurrent page requests per wave (1-8)
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            dataset: None,
            api_key: None,
            page_size: default_page_size(),
            max_rows: default_max_rows(),
            fetch_concurrency: default_fetch_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    /// Check if the store is configured enough to fetch from
    pub fn is_ready(&self) -> bool {
        self.base_url.is_some() && self.dataset.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_none() {
            return Err(Error::Config("store.base_url is required".to_string()));
        }
        if self.dataset.is_none() {
            return Err(Error::Config("store.dataset is required".to_string()));
        }
        if self.page_size == 0 || self.page_size > 1000 {
            return Err(Error::Config(
                "store.page_size must be between 1 and 1000".to_string(),
            ));
        }
        if self.fetch_concurrency == 0 || self.fetch_concurrency > 8 {
            return Err(Error::Config(
                "store.fetch_concurrency must be between 1 and 8".to_string(),
            ));
        }
        if self.max_rows < self.page_size {
            return Err(Error::Config(
                "store.max_rows must be at least one page".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_page_size() -> usize {
    500
}

fn default_max_rows() -> usize {
    10_000
}

fn default_fetch_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

/// Event classification tables.
///
/// One data-driven table feeds every breakdown and series function, so
/// module attribution is identical everywhere it appears.
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    /// Event names counted as content activity
    #[serde(default = "default_content_events")]
    pub content_events: Vec<String>,

    /// Module-run event name -> canonical module key
    #[serde(default = "default_module_events")]
    pub module_events: HashMap<String, String>,

    /// Generic "analysis run" event name resolved via `feature`
    #[serde(default = "default_generic_run_event")]
    pub generic_run_event: String,

    /// Feature-name variant -> canonical module key (case-insensitive)
    #[serde(default = "default_feature_aliases")]
    pub feature_aliases: HashMap<String, String>,

    /// Module attributed to generic runs whose feature is unknown
    #[serde(default = "default_module")]
    pub default_module: String,

    /// Event name marking a paywall block
    #[serde(default = "default_paywall_event")]
    pub paywall_event: String,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            content_events: default_content_events(),
            module_events: default_module_events(),
            generic_run_event: default_generic_run_event(),
            feature_aliases: default_feature_aliases(),
            default_module: default_module(),
            paywall_event: default_paywall_event(),
        }
    }
}

fn default_content_events() -> Vec<String> {
    vec![
        "report_viewed".to_string(),
        "report_downloaded".to_string(),
        "content_viewed".to_string(),
        "content_downloaded".to_string(),
    ]
}

fn default_module_events() -> HashMap<String, String> {
    HashMap::from([
        ("valuation_run".to_string(), "valuai".to_string()),
        ("screener_run".to_string(), "screener".to_string()),
        ("forecast_run".to_string(), "forecaster".to_string()),
    ])
}

fn default_generic_run_event() -> String {
    "analysis_run".to_string()
}

fn default_feature_aliases() -> HashMap<String, String> {
    HashMap::from([
        ("valuai_ai".to_string(), "valuai".to_string()),
        ("valu_ai".to_string(), "valuai".to_string()),
        ("ai_valuation".to_string(), "valuai".to_string()),
        ("screener_ai".to_string(), "screener".to_string()),
        ("forecast".to_string(), "forecaster".to_string()),
    ])
}

fn default_module() -> String {
    "valuai".to_string()
}

fn default_paywall_event() -> String {
    "paywall_blocked".to_string()
}

/// URL-label normalization configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UrlConfig {
    /// Host markers collapsed to a single named bucket regardless of
    /// subdomain (embedding/builder platforms fragment otherwise)
    #[serde(default = "default_platform_hosts")]
    pub platform_hosts: Vec<PlatformHost>,
}

/// One known-platform host collapse rule
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PlatformHost {
    /// Substring matched against the (www-stripped) host
    pub marker: String,
    /// Bucket label used for every matching host
    pub label: String,
}

fn default_platform_hosts() -> Vec<PlatformHost> {
    vec![PlatformHost {
        marker: "lovable".to_string(),
        label: "lovable".to_string(),
    }]
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pulsedeck/config.toml` (~/.config/pulsedeck/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pulsedeck").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pulsedeck/` (~/.local/state/pulsedeck/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pulsedeck")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pulsedeck/pulsedeck.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pulsedeck.log")
    }
}
