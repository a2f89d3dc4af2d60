//! Configuration management for waiverdesk.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.
//!
//! Credentials for the remote stores have no defaults. Each component that
//! needs them resolves its settings through [`Config::artifact_settings`],
//! [`Config::record_settings`] or [`Config::notify_settings`], which fail
//! with [`Error::ConfigMissing`] naming every absent key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::artifact::RetryPolicy;
use crate::error::{Error, Result};
use crate::render::LayoutConfig;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name under the platform config and data dirs.
const APP_DIR_NAME: &str = "waiverdesk";

/// Default queue database file name.
const QUEUE_FILE_NAME: &str = "pending.db";

/// Default directory for waivers that could not be uploaded.
const FALLBACK_DIR_NAME: &str = "unsent";

/// Environment variable prefix.
const ENV_PREFIX: &str = "WAIVERDESK_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `WAIVERDESK_`, `__` between levels)
/// 2. TOML config file at `~/.config/waiverdesk/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Object storage for rendered waivers.
    pub artifacts: ArtifactConfig,
    /// Structured record store.
    pub records: RecordConfig,
    /// Notification endpoint and pending queue.
    pub notify: NotifyConfig,
    /// Page layout of rendered waivers.
    pub layout: LayoutConfig,
    /// Outbound HTTP settings.
    pub http: HttpConfig,
    /// Local output settings.
    pub output: OutputConfig,
}

/// Object storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Storage API base URL, e.g. `https://<project>.supabase.co`.
    pub base_url: Option<String>,
    /// Service key.
    pub api_key: Option<String>,
    /// Bucket holding signed waivers.
    pub bucket: String,
    /// Folder inside the bucket.
    pub prefix: String,
    /// Largest document accepted for upload.
    pub max_upload_bytes: usize,
    /// Upload attempts before giving up, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff_ms: u64,
    /// Cap on any single retry delay.
    pub max_backoff_ms: u64,
}

/// Record store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// API root.
    pub base_url: String,
    /// Base identifier.
    pub base_id: Option<String>,
    /// Table name.
    pub table: Option<String>,
    /// Personal access token.
    pub api_key: Option<String>,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Endpoint receiving `{formData, pdfLink}` posts.
    pub endpoint_url: Option<String>,
    /// Recipient override for test deployments.
    pub recipient: Option<String>,
    /// Path to the pending queue database.
    /// Defaults to `~/.local/share/waiverdesk/pending.db`
    pub queue_path: Option<PathBuf>,
    /// Days a notification may wait in the queue before it is dropped.
    /// Set to 0 to keep entries until delivered or cleared.
    pub queue_max_age_days: u32,
}

/// Outbound HTTP configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Local output configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where waivers are written when upload fails.
    /// Defaults to `~/.local/share/waiverdesk/unsent`
    pub fallback_dir: Option<PathBuf>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            bucket: "waivers".to_string(),
            prefix: "signed".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            max_attempts: 4,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.airtable.com/v0".to_string(),
            base_id: None,
            table: None,
            api_key: None,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            recipient: None,
            queue_path: None,
            queue_max_age_days: 30,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Resolved object storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSettings {
    /// Storage API base URL.
    pub base_url: String,
    /// Service key.
    pub api_key: String,
    /// Bucket name.
    pub bucket: String,
    /// Folder inside the bucket.
    pub prefix: String,
    /// Upload size limit.
    pub max_upload_bytes: usize,
    /// Retry schedule.
    pub retry: RetryPolicy,
}

/// Resolved record store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSettings {
    /// API root.
    pub base_url: String,
    /// Base identifier.
    pub base_id: String,
    /// Table name.
    pub table: String,
    /// Access token.
    pub api_key: String,
}

/// Resolved notification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    /// Endpoint URL.
    pub endpoint_url: String,
    /// Recipient override.
    pub recipient: Option<String>,
}

/// A configured value with surrounding whitespace removed, if non-empty.
fn present(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Collects required values, remembering which are absent.
struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    fn new() -> Self {
        Self {
            missing: Vec::new(),
        }
    }

    fn take(&mut self, key: &'static str, value: Option<&String>) -> String {
        present(value).unwrap_or_else(|| {
            self.missing.push(key);
            String::new()
        })
    }

    fn finish(self, component: &'static str) -> Result<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigMissing {
                component,
                keys: self.missing,
            })
        }
    }
}

fn check_url(key: &str, value: Option<&String>) -> Result<()> {
    let Some(value) = present(value) else {
        return Ok(());
    };
    let url = Url::parse(&value)
        .map_err(|e| Error::config_validation(format!("{key} {value:?} is not a URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::config_validation(format!(
            "{key} must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(&Self::figment(&config_file))
    }

    /// The layered provider stack for `config_file`.
    #[must_use]
    pub fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate a configuration from `figment`.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(APP_DIR_NAME)
    }

    /// Validate value ranges and URL shapes.
    ///
    /// Absent credentials are not an error here; see the `*_settings`
    /// methods.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let a = &self.artifacts;
        if a.bucket.trim().is_empty() {
            return Err(Error::config_validation("artifacts.bucket must not be empty"));
        }
        if a.max_upload_bytes == 0 {
            return Err(Error::config_validation(
                "artifacts.max_upload_bytes must be greater than 0",
            ));
        }
        if !(1..=10).contains(&a.max_attempts) {
            return Err(Error::config_validation(format!(
                "artifacts.max_attempts must be between 1 and 10, got {}",
                a.max_attempts
            )));
        }
        if a.initial_backoff_ms > a.max_backoff_ms {
            return Err(Error::config_validation(format!(
                "artifacts.initial_backoff_ms ({}) cannot be greater than max_backoff_ms ({})",
                a.initial_backoff_ms, a.max_backoff_ms
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::config_validation(
                "http.timeout_secs must be greater than 0",
            ));
        }

        check_url("artifacts.base_url", a.base_url.as_ref())?;
        check_url("records.base_url", Some(&self.records.base_url))?;
        check_url("notify.endpoint_url", self.notify.endpoint_url.as_ref())?;

        self.layout
            .validate()
            .map_err(|e| Error::config_validation(format!("layout: {e}")))?;
        Ok(())
    }

    /// Object storage settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if the URL or key is not set.
    pub fn artifact_settings(&self) -> Result<ArtifactSettings> {
        let mut required = Required::new();
        let base_url = required.take("artifacts.base_url", self.artifacts.base_url.as_ref());
        let api_key = required.take("artifacts.api_key", self.artifacts.api_key.as_ref());
        required.finish("artifact store")?;

        Ok(ArtifactSettings {
            base_url,
            api_key,
            bucket: self.artifacts.bucket.trim().to_string(),
            prefix: self.artifacts.prefix.trim().to_string(),
            max_upload_bytes: self.artifacts.max_upload_bytes,
            retry: self.retry_policy(),
        })
    }

    /// Record store settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if the base id, table or key is not set.
    pub fn record_settings(&self) -> Result<RecordSettings> {
        let mut required = Required::new();
        let base_id = required.take("records.base_id", self.records.base_id.as_ref());
        let table = required.take("records.table", self.records.table.as_ref());
        let api_key = required.take("records.api_key", self.records.api_key.as_ref());
        required.finish("record store")?;

        Ok(RecordSettings {
            base_url: self.records.base_url.clone(),
            base_id,
            table,
            api_key,
        })
    }

    /// Notification endpoint settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if the endpoint is not set.
    pub fn notify_settings(&self) -> Result<NotifySettings> {
        let mut required = Required::new();
        let endpoint_url = required.take("notify.endpoint_url", self.notify.endpoint_url.as_ref());
        required.finish("notifier")?;

        Ok(NotifySettings {
            endpoint_url,
            recipient: present(self.notify.recipient.as_ref()),
        })
    }

    /// Upload retry schedule.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.artifacts.max_attempts,
            initial_delay: Duration::from_millis(self.artifacts.initial_backoff_ms),
            max_delay: Duration::from_millis(self.artifacts.max_backoff_ms),
        }
    }

    /// Get the queue database path, resolving defaults if not set.
    #[must_use]
    pub fn queue_path(&self) -> PathBuf {
        self.notify
            .queue_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(QUEUE_FILE_NAME))
    }

    /// Get the fallback output directory, resolving defaults if not set.
    #[must_use]
    pub fn fallback_dir(&self) -> PathBuf {
        self.output
            .fallback_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(FALLBACK_DIR_NAME))
    }

    /// Get the queue expiry, or `None` if entries never expire.
    #[must_use]
    pub fn queue_max_age(&self) -> Option<chrono::Duration> {
        if self.notify.queue_max_age_days == 0 {
            None
        } else {
            Some(chrono::Duration::days(i64::from(
                self.notify.queue_max_age_days,
            )))
        }
    }

    /// Get the HTTP timeout as a Duration.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Copy of the configuration with API keys masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Config {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        let mut config = self.clone();
        config.artifacts.api_key = mask(&self.artifacts.api_key);
        config.records.api_key = mask(&self.records.api_key);
        config
    }
}
