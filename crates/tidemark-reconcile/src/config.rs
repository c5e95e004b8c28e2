//! Reconciliation settings.

use std::time::Duration;

use tidemark_catalog::ConfigError;

const DEFAULT_CALL_TIMEOUT_SECS: u64 = 45;
const DEFAULT_NOT_FOUND_RECHECKS: u32 = 1;
const DEFAULT_RECHECK_DELAY_MS: u64 = 750;
/// Rechecks beyond this would hold a delivery for too long.
pub const MAX_NOT_FOUND_RECHECKS: u32 = 5;

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Upper bound on every catalog call made during a reconciliation.
    pub call_timeout: Duration,
    /// Extra fetches when an entity is not found, to ride out index lag.
    pub not_found_rechecks: u32,
    /// Pause between those fetches.
    pub recheck_delay: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            not_found_rechecks: DEFAULT_NOT_FOUND_RECHECKS,
            recheck_delay: Duration::from_millis(DEFAULT_RECHECK_DELAY_MS),
        }
    }
}

impl ReconcileConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `TIDEMARK_CALL_TIMEOUT_SECS` (default 45)
    /// - `TIDEMARK_NOT_FOUND_RECHECKS` (default 1, at most 5)
    /// - `TIDEMARK_RECHECK_DELAY_MS` (default 750)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let call_timeout = Duration::from_secs(parse_or(
            &reader,
            "TIDEMARK_CALL_TIMEOUT_SECS",
            DEFAULT_CALL_TIMEOUT_SECS,
        )?);
        if call_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "TIDEMARK_CALL_TIMEOUT_SECS".into(),
                "must be greater than zero".into(),
            ));
        }

        let not_found_rechecks = parse_or(
            &reader,
            "TIDEMARK_NOT_FOUND_RECHECKS",
            DEFAULT_NOT_FOUND_RECHECKS,
        )?;
        if not_found_rechecks > MAX_NOT_FOUND_RECHECKS {
            return Err(ConfigError::InvalidValue(
                "TIDEMARK_NOT_FOUND_RECHECKS".into(),
                format!("must be at most {MAX_NOT_FOUND_RECHECKS}"),
            ));
        }

        Ok(Self {
            call_timeout,
            not_found_rechecks,
            recheck_delay: Duration::from_millis(parse_or(
                &reader,
                "TIDEMARK_RECHECK_DELAY_MS",
                DEFAULT_RECHECK_DELAY_MS,
            )?),
        })
    }

    /// Settings for tests: no rechecks, short timeout.
    pub fn immediate() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            not_found_rechecks: 0,
            recheck_delay: Duration::ZERO,
        }
    }
}

fn parse_or<F, T>(reader: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match reader(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
