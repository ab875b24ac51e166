//! # Core Configuration Module
//!
//! Builder-based configuration for the playback session core.
//!
//! ## Overview
//!
//! [`CoreConfig`] holds the remote API location, transport settings, the
//! HTTP bridge, and the logging setup. [`CoreConfigBuilder::build`] validates
//! everything up front so misconfiguration fails at startup instead of on
//! the first position save.
//!
//! ## Required
//!
//! - `api_base_url` - root of the remote service exposing `/recent`
//!
//! ## Optional (with defaults)
//!
//! - `HttpClient` - desktop default (reqwest) when the `desktop-shims`
//!   feature is enabled, otherwise it must be injected
//! - `request_timeout` - 30 seconds
//! - `event_buffer_size` - 100 events
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.example.com")
//!     .request_timeout(Duration::from_secs(10))
//!     .build()?;
//! ```
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing base URL is rejected
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing api_base_url");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use bridge_traits::HttpClient;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Validated runtime configuration.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root URL of the remote API. Always ends with `/` so relative paths
    /// join underneath it.
    pub api_base_url: Url,

    /// Per-request timeout applied to persistence calls
    pub request_timeout: Duration,

    /// Capacity of the event bus broadcast channel
    pub event_buffer_size: usize,

    /// HTTP bridge used for all remote calls
    pub http_client: Arc<dyn HttpClient>,

    /// Logging setup applied by the service bootstrap
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("logging", &self.logging)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Resolve `path` against the API base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid endpoint path '{}': {}", path, e)))
    }

    /// Re-check invariants. `build()` already calls this.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.api_base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API base URL must use http or https, got '{}'",
                self.api_base_url.scheme()
            )));
        }

        if self.request_timeout < MIN_REQUEST_TIMEOUT || self.request_timeout > MAX_REQUEST_TIMEOUT {
            return Err(Error::Config(format!(
                "Request timeout must be between {:?} and {:?}, got {:?}",
                MIN_REQUEST_TIMEOUT, MAX_REQUEST_TIMEOUT, self.request_timeout
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                  Desktop: enable the 'desktop-shims' feature to use the reqwest client. \
                  Other hosts: inject a platform-native adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    request_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the API base URL (required).
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().api_base_url("https://api.example.com/v1");
    /// ```
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default is used when the `desktop-shims`
    /// feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when the base URL is missing or invalid, or a value
    ///   is out of range
    /// - `Error::CapabilityMissing` when no HTTP client is available
    pub fn build(self) -> Result<CoreConfig> {
        let raw_url = self
            .api_base_url
            .ok_or_else(|| Error::Config("API base URL is required".to_string()))?;
        let api_base_url = normalize_base_url(&raw_url)?;
        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let config = CoreConfig {
            api_base_url,
            request_timeout,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("API base URL cannot be empty".to_string()));
    }

    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    Url::parse(&with_slash)
        .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", trimmed, e)))
}
