//! Handler process configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use tidemark_catalog::ConfigError;
use tidemark_reconcile::policies::{CompletenessScorer, VerificationEnforcer};
use tidemark_reconcile::Policy;

/// Policy the webhook receiver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PolicyKind {
    /// Demote incompletely documented verified assets.
    Enforcer,
    /// Score documentation completeness.
    Scorer,
}

impl PolicyKind {
    pub fn build(self) -> Arc<dyn Policy> {
        match self {
            PolicyKind::Enforcer => Arc::new(VerificationEnforcer::new()),
            PolicyKind::Scorer => Arc::new(CompletenessScorer::new()),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enforcer" => Ok(PolicyKind::Enforcer),
            "scorer" => Ok(PolicyKind::Scorer),
            other => Err(format!("unknown policy '{other}', expected enforcer or scorer")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{other}', expected json or pretty")),
        }
    }
}

/// Settings for the webhook receiver and the CLI around it.
#[derive(Clone)]
pub struct HandlerConfig {
    /// Listen address for the webhook receiver.
    pub listen_addr: SocketAddr,
    pub policy: PolicyKind,
    /// Shared secret expected in the signing header. Unchecked when unset.
    pub signing_secret: Option<String>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("policy", &self.policy)
            .field(
                "signing_secret",
                &self.signing_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl HandlerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let listen_addr = reader("TIDEMARK_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("TIDEMARK_LISTEN_ADDR".into(), e.to_string()))?;

        let policy = reader("TIDEMARK_POLICY")
            .unwrap_or_else(|_| "enforcer".to_string())
            .parse::<PolicyKind>()
            .map_err(|e| ConfigError::InvalidValue("TIDEMARK_POLICY".into(), e))?;

        let signing_secret = reader("TIDEMARK_SIGNING_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let log_format = reader("TIDEMARK_LOG_FORMAT")
            .unwrap_or_else(|_| "json".to_string())
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::InvalidValue("TIDEMARK_LOG_FORMAT".into(), e))?;

        Ok(Self {
            listen_addr,
            policy,
            signing_secret,
            log_format,
        })
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
    fn test_defaults() {
        let config = HandlerConfig::from_reader(make_reader(HashMap::new())).unwrap();
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.policy, PolicyKind::Enforcer);
        assert!(config.signing_secret.is_none());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_custom_values() {
        let config = HandlerConfig::from_reader(make_reader(HashMap::from([
            ("TIDEMARK_LISTEN_ADDR", "127.0.0.1:9000"),
            ("TIDEMARK_POLICY", "Scorer"),
            ("TIDEMARK_SIGNING_SECRET", "s3cret"),
            ("TIDEMARK_LOG_FORMAT", "pretty"),
        ])))
        .unwrap();

        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.policy, PolicyKind::Scorer);
        assert_eq!(config.signing_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_empty_secret_disables_check() {
        let config = HandlerConfig::from_reader(make_reader(HashMap::from([(
            "TIDEMARK_SIGNING_SECRET",
            "",
        )])))
        .unwrap();
        assert!(config.signing_secret.is_none());
    }

    #[test]
    fn test_unknown_policy() {
        let err = HandlerConfig::from_reader(make_reader(HashMap::from([(
            "TIDEMARK_POLICY",
            "linter",
        )])))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
        assert!(err.to_string().contains("TIDEMARK_POLICY"));
    }

    #[test]
    fn test_invalid_listen_addr() {
        let err = HandlerConfig::from_reader(make_reader(HashMap::from([(
            "TIDEMARK_LISTEN_ADDR",
            "not-an-address",
        )])))
        .unwrap_err();
        assert!(err.to_string().contains("TIDEMARK_LISTEN_ADDR"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = HandlerConfig::from_reader(make_reader(HashMap::from([(
            "TIDEMARK_SIGNING_SECRET",
            "s3cret",
        )])))
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
