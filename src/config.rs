//! Recorder configuration.

use std::env;

use crate::domain::ConfigError;

/// Environment variable overriding [`RecorderConfig::label`].
pub const LABEL_ENV: &str = "SQL_DOUBLES_LABEL";

/// Environment variable overriding [`RecorderConfig::log_calls`].
pub const LOG_CALLS_ENV: &str = "SQL_DOUBLES_LOG_CALLS";

/// Settings shared by every recorder a double creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Prefix used in failure messages and log fields.
    pub label: String,
    /// Emit a `debug` event for every recorded call.
    pub log_calls: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            label: "mock".to_string(),
            log_calls: true,
        }
    }
}

impl RecorderConfig {
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_log_calls(mut self, enabled: bool) -> Self {
        self.log_calls = enabled;
        self
    }

    /// Builds a config from the defaults, overridden by environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` when a variable is set to a value
    /// that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(label) = lookup(LABEL_ENV) {
            if label.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: LABEL_ENV.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            config.label = label;
        }

        if let Some(raw) = lookup(LOG_CALLS_ENV) {
            config.log_calls = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: LOG_CALLS_ENV.to_string(),
                message: format!("expected a boolean, got '{raw}'"),
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = RecorderConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, RecorderConfig::default());
        assert_eq!(config.label, "mock");
        assert!(config.log_calls);
    }

    #[test]
    fn test_from_env_with_variables_unset() {
        if env::var_os(LABEL_ENV).is_some() || env::var_os(LOG_CALLS_ENV).is_some() {
            return;
        }
        let config = RecorderConfig::from_env().unwrap();
        assert_eq!(config, RecorderConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = RecorderConfig::from_lookup(lookup_from(&[
            (LABEL_ENV, "orders-db"),
            (LOG_CALLS_ENV, "off"),
        ]))
        .unwrap();
        assert_eq!(config.label, "orders-db");
        assert!(!config.log_calls);
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let err = RecorderConfig::from_lookup(lookup_from(&[(LOG_CALLS_ENV, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == LOG_CALLS_ENV));
    }

    #[test]
    fn test_empty_label_is_rejected() {
        let err = RecorderConfig::from_lookup(lookup_from(&[(LABEL_ENV, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_builder() {
        let config = RecorderConfig::default()
            .with_label("tx")
            .with_log_calls(false);
        assert_eq!(config.label, "tx");
        assert!(!config.log_calls);
    }
}
