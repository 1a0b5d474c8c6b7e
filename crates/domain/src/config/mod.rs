mod identity;
mod observability;
mod polling;
mod provider;
mod server;
mod store;

pub use identity::*;
pub use observability::*;
pub use polling::*;
pub use provider::*;
pub use server::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |severity, field: &str, message: &str| {
            errors.push(ConfigError {
                severity,
                field: field.into(),
                message: message.into(),
            });
        };

        if self.server.port == 0 {
            push(ConfigSeverity::Error, "server.port", "port must be greater than 0");
        }
        if self.server.host.is_empty() {
            push(ConfigSeverity::Error, "server.host", "host must not be empty");
        }
        let prefix = &self.server.api_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            push(
                ConfigSeverity::Error,
                "server.api_prefix",
                "api_prefix must be empty or start with '/'",
            );
        }
        if self.server.cors.allowed_origins.iter().any(|o| o == "*") {
            push(
                ConfigSeverity::Warning,
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            );
        }

        if self.provider.base_url.is_empty() {
            push(ConfigSeverity::Error, "provider.base_url", "base_url must not be empty");
        }
        if self.provider.model.is_empty() {
            push(ConfigSeverity::Error, "provider.model", "model must not be empty");
        }

        if self.polling.run_interval_ms == 0 {
            push(
                ConfigSeverity::Error,
                "polling.run_interval_ms",
                "poll interval must be greater than 0",
            );
        }
        if self.polling.batch_interval_ms == 0 {
            push(
                ConfigSeverity::Error,
                "polling.batch_interval_ms",
                "poll interval must be greater than 0",
            );
        }

        match self.identity.verification.mode {
            VerificationMode::None => push(
                ConfigSeverity::Warning,
                "identity.verification.mode",
                "credential signatures are not verified; an upstream gateway must do it",
            ),
            VerificationMode::Hs256 => {
                if self.identity.verification.secret_env.is_none() {
                    push(
                        ConfigSeverity::Error,
                        "identity.verification.secret_env",
                        "hs256 verification requires secret_env",
                    );
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(cfg: &Config) -> Vec<String> {
        cfg.validate()
            .into_iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn default_config_has_no_errors() {
        assert!(errors(&Config::default()).is_empty());
    }

    #[test]
    fn default_config_warns_about_unverified_credentials() {
        let issues = Config::default().validate();
        assert!(issues.iter().any(|i| i.severity == ConfigSeverity::Warning
            && i.field == "identity.verification.mode"));
    }

    #[test]
    fn zero_intervals_are_errors() {
        let mut cfg = Config::default();
        cfg.polling.run_interval_ms = 0;
        cfg.polling.batch_interval_ms = 0;
        let fields = errors(&cfg);
        assert!(fields.contains(&"polling.run_interval_ms".to_string()));
        assert!(fields.contains(&"polling.batch_interval_ms".to_string()));
    }

    #[test]
    fn hs256_without_secret_is_error() {
        let mut cfg = Config::default();
        cfg.identity.verification.mode = VerificationMode::Hs256;
        assert_eq!(errors(&cfg), vec!["identity.verification.secret_env".to_string()]);
    }

    #[test]
    fn prefix_must_be_absolute_or_empty() {
        let mut cfg = Config::default();
        cfg.server.api_prefix = "api".into();
        assert_eq!(errors(&cfg), vec!["server.api_prefix".to_string()]);
        cfg.server.api_prefix = String::new();
        assert!(errors(&cfg).is_empty());
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError {
            severity: ConfigSeverity::Warning,
            field: "server.host".into(),
            message: "odd".into(),
        };
        assert_eq!(e.to_string(), "[WARN] server.host: odd");
    }
}
