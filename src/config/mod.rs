//! Configuration management for the hakwonplus client
//!
//! This module handles loading and validating configuration from environment variables
//! and TOML files. There is no runtime config endpoint: everything the client needs
//! (API base URL, CDN base URL, tenant override) is known before the first request.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Versioned path segment every feature module assumes
pub const API_PREFIX: &str = "/api/v1";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend API configuration
    pub api: ApiConfig,

    /// Tenant resolution inputs
    pub tenant: TenantConfig,

    /// Local persistent storage
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API origin, without the `/api/v1` suffix
    pub base_url: String,

    /// CDN origin for media and branding assets
    pub cdn_base_url: Option<String>,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

/// Tenant resolution inputs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Hostname the client is "browsing" from
    pub hostname: Option<String>,

    /// Explicit tenant code override (dev/bootstrap only)
    pub code: Option<String>,
}

/// Local persistent storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding tokens, device id and preferences.
    /// `None` keeps everything in memory.
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = non_empty_env("HAKWON_API_BASE_URL")
            .unwrap_or_else(|| String::from("http://localhost:8000"));

        let cdn_base_url = non_empty_env("HAKWON_CDN_BASE_URL");

        let request_timeout_secs = std::env::var("HAKWON_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let user_agent = non_empty_env("HAKWON_USER_AGENT")
            .unwrap_or_else(|| format!("hakwonplus/{}", env!("CARGO_PKG_VERSION")));

        let storage_path = non_empty_env("HAKWON_STORAGE_PATH").map(PathBuf::from);

        let log_level = non_empty_env("HAKWON_LOG_LEVEL").unwrap_or_else(|| String::from("info"));
        let log_format =
            non_empty_env("HAKWON_LOG_FORMAT").unwrap_or_else(|| String::from("text"));

        Ok(Self {
            api: ApiConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                cdn_base_url: cdn_base_url.map(|u| u.trim_end_matches('/').to_string()),
                request_timeout_secs,
                user_agent,
            },
            tenant: TenantConfig {
                hostname: non_empty_env("HAKWON_HOSTNAME"),
                code: non_empty_env("HAKWON_TENANT_CODE"),
            },
            storage: StorageConfig { path: storage_path },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url is not a URL: {}", self.api.base_url))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("api.base_url must be http(s), got {}", parsed.scheme());
        }

        if self.api.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Root every API path is appended to, e.g. `https://api.example.com/api/v1`
    #[must_use]
    pub fn api_root(&self) -> String {
        format!("{}{API_PREFIX}", self.api.base_url.trim_end_matches('/'))
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// Resolve a CDN-relative asset path to an absolute URL
    #[must_use]
    pub fn cdn_url(&self, path: &str) -> Option<String> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.to_string());
        }
        self.api
            .cdn_base_url
            .as_ref()
            .map(|base| format!("{base}/{}", path.trim_start_matches('/')))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: String::from("http://localhost:8000"),
                cdn_base_url: None,
                request_timeout_secs: 30,
                user_agent: format!("hakwonplus/{}", env!("CARGO_PKG_VERSION")),
            },
            tenant: TenantConfig::default(),
            storage: StorageConfig { path: None },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
