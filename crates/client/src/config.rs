//! Client configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use valentine_gateway::HttpGatewayConfig;

use crate::cache::ResourceKind;

/// Configuration errors. Every variant names the offending variable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is invalid ({value:?}): {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Log output format for the editor binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected `plain` or `json`, got `{other}`")),
        }
    }
}

/// Staleness windows per cached resource.
///
/// `None` means an entry is served from cache until it is invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub draft_content: Option<Duration>,
    pub published_content: Option<Duration>,
    pub publish_status: Option<Duration>,
    pub versions: Option<Duration>,
    pub caller_identity: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            draft_content: None,
            published_content: Some(Duration::from_secs(30)),
            publish_status: Some(Duration::from_secs(10)),
            versions: Some(Duration::from_secs(60)),
            caller_identity: None,
        }
    }
}

impl CacheConfig {
    /// Staleness window for one resource.
    pub fn stale_after(&self, resource: ResourceKind) -> Option<Duration> {
        match resource {
            ResourceKind::DraftContent => self.draft_content,
            ResourceKind::PublishedContent => self.published_content,
            ResourceKind::PublishStatus => self.publish_status,
            ResourceKind::Versions => self.versions,
            ResourceKind::CallerProfile | ResourceKind::CallerRole | ResourceKind::IsAdmin => {
                self.caller_identity
            }
        }
    }
}

/// Everything the editor needs to reach the backend and persist state.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend RPC endpoint.
    pub backend_url: String,
    /// Bearer token for the caller identity; `None` for anonymous.
    pub backend_token: Option<String>,
    /// Transport timeout. The client layer itself enforces none.
    pub request_timeout: Duration,
    /// Where the active version is persisted.
    pub version_store_path: PathBuf,
    /// Origin used to build share links.
    pub share_base_url: String,
    pub log_format: LogFormat,
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:4943".into(),
            backend_token: None,
            request_timeout: Duration::from_secs(30),
            version_store_path: PathBuf::from(".valentine/active-version.json"),
            share_base_url: "http://localhost:5173".into(),
            log_format: LogFormat::Plain,
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                          |
    /// |------------------------|----------------------------------|
    /// | `BACKEND_URL`          | `http://127.0.0.1:4943`          |
    /// | `BACKEND_TOKEN`        | unset                            |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                             |
    /// | `VERSION_STORE_PATH`   | `.valentine/active-version.json` |
    /// | `SHARE_BASE_URL`       | `http://localhost:5173`          |
    /// | `LOG_FORMAT`           | `plain`                          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    var: "REQUEST_TIMEOUT_SECS",
                    value: raw.clone(),
                    reason: format!("{e}"),
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        let log_format = match var("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "LOG_FORMAT",
                value: raw.clone(),
                reason,
            })?,
            None => defaults.log_format,
        };

        Ok(Self {
            backend_url: var("BACKEND_URL").unwrap_or(defaults.backend_url),
            backend_token: var("BACKEND_TOKEN"),
            request_timeout,
            version_store_path: var("VERSION_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.version_store_path),
            share_base_url: var("SHARE_BASE_URL").unwrap_or(defaults.share_base_url),
            log_format,
            cache: defaults.cache,
        })
    }

    /// Settings for an [`HttpGateway`](valentine_gateway::HttpGateway).
    pub fn gateway_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            base_url: self.backend_url.clone(),
            token: self.backend_token.clone(),
            request_timeout: self.request_timeout,
        }
    }
}
