//! Environment configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `GEOSTATS_API_URL` | `https://buddhi-group-be.onrender.com` |
//! | `GEOSTATS_GEO_URL` | `https://cencusbackend.onrender.com/api` |
//! | `GEOSTATS_MAX_RETRIES` | `2` |
//! | `GEOSTATS_HTTP_TIMEOUT_SECS` | unset (no timeout) |
//! | `GEOSTATS_SELECTION_POLICY` | `per-family` |

use std::time::Duration;

use geostats_fetch::http::HttpStatsSource;
use geostats_fetch::retry::RetryPolicy;
use geostats_geography::HttpGeoSource;
use thiserror::Error;

use crate::SelectionPolicy;

const DEFAULT_API_URL: &str = "https://buddhi-group-be.onrender.com";
const DEFAULT_GEO_URL: &str = "https://cencusbackend.onrender.com/api";

/// Errors in the environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set to something unusable.
    #[error("invalid {key}={value:?}: {message}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Its value.
        value: String,
        /// Why it was rejected.
        message: String,
    },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Where the backends are and how to talk to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Statistics backend base URL.
    pub api_url: String,
    /// Boundary service base URL.
    pub geo_url: String,
    /// Retries after a transient failure.
    pub max_retries: u32,
    /// Per-request timeout; `None` waits indefinitely.
    pub http_timeout: Option<Duration>,
    /// Whether drill-down selections propagate across families.
    pub selection_policy: SelectionPolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            geo_url: DEFAULT_GEO_URL.to_string(),
            max_retries: RetryPolicy::default().max_retries,
            http_timeout: None,
            selection_policy: SelectionPolicy::default(),
        }
    }
}

impl DashboardConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a malformed variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let max_retries = match var("GEOSTATS_MAX_RETRIES") {
            Some(value) => parse("GEOSTATS_MAX_RETRIES", &value)?,
            None => defaults.max_retries,
        };
        let http_timeout = match var("GEOSTATS_HTTP_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(parse(
                "GEOSTATS_HTTP_TIMEOUT_SECS",
                &value,
            )?)),
            None => None,
        };
        let selection_policy = match var("GEOSTATS_SELECTION_POLICY") {
            Some(value) => parse("GEOSTATS_SELECTION_POLICY", &value)?,
            None => defaults.selection_policy,
        };

        Ok(Self {
            api_url: var("GEOSTATS_API_URL").unwrap_or(defaults.api_url),
            geo_url: var("GEOSTATS_GEO_URL").unwrap_or(defaults.geo_url),
            max_retries,
            http_timeout,
            selection_policy,
        })
    }

    /// Builds the shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Client`] if the TLS backend fails to
    /// initialize.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.http_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }

    /// The statistics backend.
    #[must_use]
    pub fn stats_source(&self, client: reqwest::Client) -> HttpStatsSource {
        let retry = RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        };
        HttpStatsSource::new(client, &self.api_url, retry)
    }

    /// The boundary service.
    #[must_use]
    pub fn geo_source(&self, client: reqwest::Client) -> HttpGeoSource {
        HttpGeoSource::new(client, &self.geo_url)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config(vars: &[(&str, &str)]) -> Result<DashboardConfig, ConfigError> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        DashboardConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.http_timeout, None);
        assert_eq!(config.selection_policy, SelectionPolicy::PerFamily);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("GEOSTATS_API_URL", "http://localhost:8000"),
            ("GEOSTATS_MAX_RETRIES", "0"),
            ("GEOSTATS_HTTP_TIMEOUT_SECS", " 30 "),
            ("GEOSTATS_SELECTION_POLICY", "shared"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.geo_url, DEFAULT_GEO_URL);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.http_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.selection_policy, SelectionPolicy::Shared);
    }

    #[test]
    fn blank_values_mean_unset() {
        let config = config(&[("GEOSTATS_API_URL", "  "), ("GEOSTATS_MAX_RETRIES", "")]).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn malformed_values() {
        let err = config(&[("GEOSTATS_MAX_RETRIES", "many")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "GEOSTATS_MAX_RETRIES",
                ..
            }
        ));
    }

    #[test]
    fn unknown_selection_policy_names_the_key() {
        let err = config(&[("GEOSTATS_SELECTION_POLICY", "global")]).unwrap_err();
        let ConfigError::Invalid { key, value, message } = &err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(*key, "GEOSTATS_SELECTION_POLICY");
        assert_eq!(value, "global");
        assert!(!message.is_empty());
        assert!(err.to_string().contains("GEOSTATS_SELECTION_POLICY"));

        let config = config(&[("GEOSTATS_SELECTION_POLICY", " shared ")]).unwrap();
        assert_eq!(config.selection_policy, SelectionPolicy::Shared);
    }

    #[test]
    fn stats_source_uses_configured_url() {
        let config = config(&[("GEOSTATS_API_URL", "http://localhost:8000/")]).unwrap();
        let source = config.stats_source(reqwest::Client::new());
        assert_eq!(source.base_url(), "http://localhost:8000");
    }
}
