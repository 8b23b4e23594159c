//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Default meal-plan service endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://mipvvnn83i.us-east-1.awsapprunner.com/saveUserMealPlan";

/// Environment variable overriding the endpoint URL.
pub const ENDPOINT_ENV: &str = "MEAL_PLAN_ENDPOINT";
/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "MEAL_PLAN_TIMEOUT_SECS";

/// Submission configuration.
#[derive(Debug, Clone)]
pub struct SubmitConfig {
    /// URL the payload is POSTed to.
    pub endpoint: String,
    /// Transport-level timeout for the single request.
    pub timeout: Duration,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl SubmitConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            let endpoint = endpoint.trim();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: ENDPOINT_ENV.to_string(),
                    message: format!("expected an http(s) URL, got {endpoint:?}"),
                });
            }
            config.endpoint = endpoint.to_string();
        }

        if let Some(secs) = lookup(TIMEOUT_ENV) {
            let secs: u64 = secs.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: TIMEOUT_ENV.to_string(),
                message: format!("{e}"),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: TIMEOUT_ENV.to_string(),
                    message: "timeout must be at least one second".to_string(),
                });
            }
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = SubmitConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides_from_env() {
        let config = SubmitConfig::from_lookup(lookup(&[
            (ENDPOINT_ENV, "http://127.0.0.1:9000/save"),
            (TIMEOUT_ENV, "5"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:9000/save");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = SubmitConfig::from_lookup(lookup(&[(ENDPOINT_ENV, "ftp://nope")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENDPOINT_ENV));
    }

    #[test]
    fn rejects_bad_timeout() {
        assert!(SubmitConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "soon")])).is_err());
        assert!(SubmitConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "0")])).is_err());
    }
}
