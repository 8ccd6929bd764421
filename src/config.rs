//! Configuration management for fsspacquire.
//!
//! A TOML file (`fsspacquire.toml`) is deserialised into [`Config`], whose
//! fields are all optional, and then applied on top of [`Settings::default`].
//! `FSSP_*` environment variables take precedence over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::client::ClientSettings;
use crate::orchestrator::RetryPolicy;

/// Config file name looked up in the working directory and the user config dir.
pub const CONFIG_FILENAME: &str = "fsspacquire.toml";

/// Default site root.
pub const DEFAULT_BASE_URL: &str = "https://is.fssp.gov.ru/";

/// Default command-line fragment identifying a live batch process.
pub const DEFAULT_PROCESS_SIGNATURE: &str = "fssp run";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid base URL {0:?}")]
    BaseUrl(String),
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory for tracker, output and ledger files.
    pub data_dir: PathBuf,
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Fixed user agent; a browser one is picked per session when unset.
    pub user_agent: Option<String>,
    /// Proxy list file, one URI per line.
    pub proxy_file: Option<PathBuf>,
    /// Proxies given inline in the config file.
    pub proxies: Vec<String>,
    pub shuffle_proxies: bool,
    pub tracker_path: PathBuf,
    pub process_signature: String,
    pub ocr_binary: String,
    pub ocr_language: String,
    /// Resize factors for the captcha solver; the built-in schedule when unset.
    pub captcha_factors: Option<Vec<f64>>,
    pub output_path: PathBuf,
    pub captcha_ledger_path: PathBuf,
    pub client: ClientSettings,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        // Data dir -> Home dir -> Current dir
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fsspacquire");

        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Default settings with every file placed under `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            tracker_path: data_dir.join("fssp-tracker.json"),
            output_path: data_dir.join("proceedings.jsonl"),
            captcha_ledger_path: data_dir.join("captcha.jsonl"),
            data_dir,
            base_url: default_base_url(),
            connect_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(60),
            user_agent: None,
            proxy_file: None,
            proxies: Vec::new(),
            shuffle_proxies: true,
            process_signature: DEFAULT_PROCESS_SIGNATURE.to_string(),
            ocr_binary: "tesseract".to_string(),
            ocr_language: "rus".to_string(),
            captcha_factors: None,
            client: ClientSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Create the data directory if it does not exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

/// Throttle section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaker_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaker_cooldown_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_cooldown_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_pause_secs: Option<u64>,
}

/// OCR section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OcrConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factors: Option<Vec<f64>>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Connect timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_proxies: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_ledger: Option<String>,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific TOML file.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) -> Result<(), ConfigError> {
        if let Some(ref data_dir) = self.data_dir {
            let data_dir = self.resolve_path(data_dir, base_dir);
            *settings = Settings {
                tracker_path: data_dir.join("fssp-tracker.json"),
                output_path: data_dir.join("proceedings.jsonl"),
                captcha_ledger_path: data_dir.join("captcha.jsonl"),
                data_dir,
                ..settings.clone()
            };
        }
        if let Some(ref base_url) = self.base_url {
            settings.base_url = parse_base_url(base_url)?;
        }
        if let Some(secs) = self.request_timeout {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.connect_timeout {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(ref ua) = self.user_agent {
            settings.user_agent = Some(ua.clone());
        }
        if let Some(ref file) = self.proxy_file {
            settings.proxy_file = Some(self.resolve_path(file, base_dir));
        }
        if !self.proxies.is_empty() {
            settings.proxies = self.proxies.clone();
        }
        if let Some(shuffle) = self.shuffle_proxies {
            settings.shuffle_proxies = shuffle;
        }
        if let Some(ref file) = self.tracker_file {
            settings.tracker_path = self.resolve_path(file, base_dir);
        }
        if let Some(ref signature) = self.process_signature {
            settings.process_signature = signature.clone();
        }
        if let Some(ref file) = self.output_file {
            settings.output_path = self.resolve_path(file, base_dir);
        }
        if let Some(ref file) = self.captcha_ledger {
            settings.captcha_ledger_path = self.resolve_path(file, base_dir);
        }

        if let Some(ref binary) = self.ocr.binary {
            settings.ocr_binary = binary.clone();
        }
        if let Some(ref language) = self.ocr.language {
            settings.ocr_language = language.clone();
        }
        if let Some(ref factors) = self.ocr.factors {
            settings.captcha_factors = Some(factors.clone());
        }

        let throttle = &self.throttle;
        if let Some(n) = throttle.breaker_threshold {
            settings.client.breaker_threshold = n;
        }
        if let Some(secs) = throttle.breaker_cooldown_secs {
            settings.client.breaker_cooldown = Duration::from_secs(secs);
        }
        if let Some(secs) = throttle.busy_cooldown_secs {
            settings.client.busy_cooldown = Duration::from_secs(secs);
        }
        if let Some(n) = throttle.soft_threshold {
            settings.retry.soft_threshold = n;
        }
        if let Some(n) = throttle.hard_threshold {
            settings.retry.hard_threshold = n;
        }
        if let Some(secs) = throttle.hard_pause_secs {
            settings.retry.hard_pause = Duration::from_secs(secs);
        }
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    // Endpoint paths are joined onto the base, so it must end with a slash.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|_| ConfigError::BaseUrl(raw.to_string()))
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

/// Find a config file: working directory first, then the user config dir.
fn discover_config() -> Option<PathBuf> {
    let cwd = PathBuf::from(CONFIG_FILENAME);
    if cwd.exists() {
        return Some(cwd);
    }
    dirs::config_dir()
        .map(|dir| dir.join("fsspacquire").join(CONFIG_FILENAME))
        .filter(|path| path.exists())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Load settings from the config file and environment.
pub async fn load_settings_with_options(options: LoadOptions) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path.clone().or_else(discover_config) {
        Some(path) => Config::load_from_path(&path).await?,
        None => Config::default(),
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd.clone()
    } else {
        config.base_dir().unwrap_or_else(|| cwd.clone())
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir)?;
    apply_env_overrides(&mut settings, &config, &cwd)?;

    Ok((settings, config))
}

/// `FSSP_*` environment variables take precedence over the config file.
fn apply_env_overrides(settings: &mut Settings, config: &Config, cwd: &Path) -> Result<(), ConfigError> {
    if let Some(url) = env_var("FSSP_BASE_URL") {
        tracing::debug!("Using FSSP_BASE_URL from environment: {}", url);
        settings.base_url = parse_base_url(&url)?;
    }
    if let Some(file) = env_var("FSSP_PROXY_FILE") {
        settings.proxy_file = Some(config.resolve_path(&file, cwd));
    }
    if let Some(file) = env_var("FSSP_TRACKER_FILE") {
        settings.tracker_path = config.resolve_path(&file, cwd);
    }
    if let Some(binary) = env_var("FSSP_TESSERACT") {
        settings.ocr_binary = binary;
    }
    Ok(())
}
