//! Catalog connection configuration.

use std::time::Duration;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection settings for the catalog REST API.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Tenant base URL, e.g. `https://tenant.atlan.com`.
    pub base_url: String,
    /// API token sent as a bearer credential.
    pub api_key: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

fn default_user_agent() -> String {
    format!("tidemark/{}", env!("CARGO_PKG_VERSION"))
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `ATLAN_BASE_URL`
    /// - `ATLAN_API_KEY`
    ///
    /// Optional:
    /// - `TIDEMARK_HTTP_TIMEOUT_SECS` (default 30)
    /// - `TIDEMARK_CONNECT_TIMEOUT_SECS` (default 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let base_url =
            reader("ATLAN_BASE_URL").map_err(|_| ConfigError::MissingVar("ATLAN_BASE_URL".into()))?;
        let api_key =
            reader("ATLAN_API_KEY").map_err(|_| ConfigError::MissingVar("ATLAN_API_KEY".into()))?;

        let request_timeout = read_secs(
            &reader,
            "TIDEMARK_HTTP_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let connect_timeout = read_secs(
            &reader,
            "TIDEMARK_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;

        let config = Self {
            base_url,
            api_key,
            request_timeout,
            connect_timeout,
            user_agent: default_user_agent(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "ATLAN_BASE_URL".into(),
                format!("'{}' is not an http(s) URL", self.base_url),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "ATLAN_API_KEY".into(),
                "value is empty".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "TIDEMARK_HTTP_TIMEOUT_SECS".into(),
                "must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn read_secs<F>(reader: &F, var: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    match reader(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

/// Builder for [`CatalogConfig`].
#[derive(Debug, Default)]
pub struct CatalogConfigBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl CatalogConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<CatalogConfig, ConfigError> {
        let config = CatalogConfig {
            base_url: self
                .base_url
                .ok_or_else(|| ConfigError::MissingVar("base_url".into()))?,
            api_key: self
                .api_key
                .ok_or_else(|| ConfigError::MissingVar("api_key".into()))?,
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            connect_timeout: self
                .connect_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            user_agent: default_user_agent(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env::VarError;

    fn make_reader(vars: HashMap<&str, &str>) -> impl Fn(&str) -> Result<String, VarError> {
        let owned: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| owned.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_missing_base_url() {
        let err = CatalogConfig::from_reader(make_reader(HashMap::new())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "ATLAN_BASE_URL"));
    }

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::from_reader(make_reader(HashMap::from([
            ("ATLAN_BASE_URL", "https://tenant.atlan.com"),
            ("ATLAN_API_KEY", "secret"),
        ])))
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("tidemark/"));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = CatalogConfig::from_reader(make_reader(HashMap::from([
            ("ATLAN_BASE_URL", "https://tenant.atlan.com"),
            ("ATLAN_API_KEY", "secret"),
            ("TIDEMARK_HTTP_TIMEOUT_SECS", "soon"),
        ])))
        .unwrap_err();
        assert!(err.to_string().contains("TIDEMARK_HTTP_TIMEOUT_SECS"));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = CatalogConfig::builder()
            .base_url("tenant.atlan.com")
            .api_key("secret")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = CatalogConfig::builder()
            .base_url("https://tenant.atlan.com")
            .api_key("super-secret-token")
            .build()
            .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
