use crate::credentials::OpenStackCredentials;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for ExporterConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::invalid_value(
                "refresh_interval_secs",
                "must be at least 1 second",
            ));
        }

        if self.listen_address.is_empty() {
            return Err(ConfigError::MissingRequired("listen_address".to_string()));
        }

        let port = self
            .listen_address
            .rsplit_once(':')
            .map(|(_, port)| port)
            .unwrap_or_default();
        if port.parse::<u16>().map_or(true, |p| p == 0) {
            return Err(ConfigError::invalid_value(
                "listen_address",
                format!("expected host:port or :port, got {}", self.listen_address),
            ));
        }

        if !is_valid_prefix(&self.metrics_prefix) {
            return Err(ConfigError::invalid_value(
                "metrics_prefix",
                format!(
                    "must start with a letter or underscore and contain only letters, digits and underscores, got {}",
                    self.metrics_prefix
                ),
            ));
        }

        self.backoff.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

impl Validator for BackoffConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.initial_secs == 0 {
            return Err(ConfigError::invalid_value(
                "backoff.initial_secs",
                "must be at least 1 second",
            ));
        }

        if self.max_secs < self.initial_secs {
            return Err(ConfigError::invalid_value(
                "backoff.max_secs",
                format!(
                    "must not be smaller than backoff.initial_secs ({})",
                    self.initial_secs
                ),
            ));
        }

        Ok(())
    }
}

impl Validator for LogSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.level.is_empty() {
            return Err(ConfigError::MissingRequired("log.level".to_string()));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "log.format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        let valid_outputs = ["stderr", "stdout"];
        if !valid_outputs.contains(&self.output.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "log.output",
                format!("must be one of: {}", valid_outputs.join(", ")),
            ));
        }

        Ok(())
    }
}

impl Validator for OpenStackCredentials {
    fn validate(&self) -> ConfigResult<()> {
        if self.auth_url.is_empty() {
            return Err(ConfigError::missing_credential("auth-url"));
        }

        if self.username.is_empty() && self.user_id.is_empty() {
            return Err(ConfigError::missing_credential("username or user-id"));
        }

        if self.password.is_empty() {
            return Err(ConfigError::missing_credential("password"));
        }

        Ok(())
    }
}

/// An empty prefix disables prefixing, anything else must be a valid
/// Prometheus metric name fragment
fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        None => true,
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        Some(_) => false,
    }
}
