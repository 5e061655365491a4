// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
use crate::error::{ConfigError, ConfigResult};
use crate::schema::ExporterConfig;
use crate::validation::Validator;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration loader
///
/// Precedence, lowest first: defaults, config file, `NIMBUS_*` variables.
/// Command-line flags are layered on top by the binary.
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load defaults, an optional file and the environment
    pub async fn load(&self, path: Option<&Path>) -> ConfigResult<ExporterConfig> {
        let mut config = match path {
            Some(path) => self.read_file(path).await?,
            None => ExporterConfig::default(),
        };
        apply_env_overrides(&mut config)?;

        if self.validate {
            config.validate()?;
            debug!("Configuration validated successfully");
        }

        Ok(config)
    }

    async fn read_file(&self, path: &Path) -> ConfigResult<ExporterConfig> {
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).await?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        parse(&content, format)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(content: &str, format: ConfigFormat) -> ConfigResult<ExporterConfig> {
    let config = match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
    };
    Ok(config)
}

/// Apply `NIMBUS_*` overrides from the process environment
pub fn apply_env_overrides(config: &mut ExporterConfig) -> ConfigResult<()> {
    apply_overrides_from(config, |name| std::env::var(name).ok())
}

/// Apply `NIMBUS_*` overrides through an arbitrary variable lookup
///
/// `KUBECONFIG` fills the kubeconfig path when neither the file nor
/// `NIMBUS_KUBECONFIG` set one.
pub fn apply_overrides_from<F>(config: &mut ExporterConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("NIMBUS_REFRESH_INTERVAL") {
        config.refresh_interval_secs = parse_number("NIMBUS_REFRESH_INTERVAL", &value)?;
    }
    if let Some(value) = lookup("NIMBUS_LISTEN_ADDRESS") {
        config.listen_address = value;
    }
    if let Some(value) = lookup("NIMBUS_CLOUD_CONF") {
        config.cloud_conf = non_empty_path(value);
    }
    if let Some(value) = lookup("NIMBUS_KUBECONFIG") {
        config.kubeconfig = non_empty_path(value);
    }
    if let Some(value) = lookup("NIMBUS_METRICS_PREFIX") {
        config.metrics_prefix = value;
    }
    if let Some(value) = lookup("NIMBUS_BACKOFF_INITIAL") {
        config.backoff.initial_secs = parse_number("NIMBUS_BACKOFF_INITIAL", &value)?;
    }
    if let Some(value) = lookup("NIMBUS_BACKOFF_MAX") {
        config.backoff.max_secs = parse_number("NIMBUS_BACKOFF_MAX", &value)?;
    }
    if let Some(value) = lookup("NIMBUS_LOG_LEVEL") {
        config.log.level = value;
    }
    if let Some(value) = lookup("NIMBUS_LOG_FORMAT") {
        config.log.format = value;
    }
    if let Some(value) = lookup("NIMBUS_LOG_OUTPUT") {
        config.log.output = value;
    }
    if let Some(value) = lookup("NIMBUS_LOG_COLOR") {
        config.log.color = value.trim().parse().map_err(|_| {
            ConfigError::env_var_parsing_error("NIMBUS_LOG_COLOR", &value, "expected true or false")
        })?;
    }

    if config.kubeconfig.is_none() {
        config.kubeconfig = lookup("KUBECONFIG").and_then(non_empty_path);
    }

    Ok(())
}

fn non_empty_path(value: String) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn parse_number<T: FromStr>(variable: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::env_var_parsing_error(variable, value, "expected a non-negative integer")
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |name| vars.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_path("nimbus.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("nimbus.yaml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("nimbus.yml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("nimbus.json").unwrap(), ConfigFormat::Json);
    }

    #[test]
    fn test_format_detection_error() {
        assert!(ConfigFormat::from_path("nimbus.ini").is_err());
        assert!(ConfigFormat::from_path("nimbus").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
        refresh_interval_secs = 60
        listen_address = "127.0.0.1:9200"

        [backoff]
        max_secs = 600
        "#;
        let config = parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.listen_address, "127.0.0.1:9200");
        assert_eq!(config.backoff.initial_secs, 1);
        assert_eq!(config.backoff.max_secs, 600);
        assert_eq!(config.metrics_prefix, "kos");
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = "metrics_prefix: openstack\nlog:\n  level: debug\n  format: json\n  output: stdout\n";
        let config = parse(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.metrics_prefix, "openstack");
        assert_eq!(config.log.format, "json");
        assert_eq!(config.log.output, "stdout");
        assert!(!config.log.color);
    }

    #[test]
    fn test_parse_json() {
        let config = parse(r#"{"refresh_interval_secs": 0}"#, ConfigFormat::Json).unwrap();
        assert_eq!(config.refresh_interval_secs, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ExporterConfig::default();
        let lookup = lookup_from(&[
            ("NIMBUS_REFRESH_INTERVAL", "30"),
            ("NIMBUS_LISTEN_ADDRESS", ":9999"),
            ("NIMBUS_METRICS_PREFIX", ""),
            ("NIMBUS_CLOUD_CONF", "/etc/kubernetes/cloud.conf"),
            ("NIMBUS_BACKOFF_MAX", "120"),
            ("NIMBUS_LOG_OUTPUT", "stdout"),
            ("NIMBUS_LOG_COLOR", "true"),
        ]);
        apply_overrides_from(&mut config, lookup).unwrap();

        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(config.listen_address, ":9999");
        assert_eq!(config.metrics_prefix, "");
        assert_eq!(
            config.cloud_conf,
            Some(PathBuf::from("/etc/kubernetes/cloud.conf"))
        );
        assert_eq!(config.backoff.max_secs, 120);
        assert_eq!(config.log.output, "stdout");
        assert!(config.log.color);
    }

    #[test]
    fn test_env_override_parse_error() {
        let mut config = ExporterConfig::default();
        let err =
            apply_overrides_from(&mut config, lookup_from(&[("NIMBUS_REFRESH_INTERVAL", "soon")]))
                .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvVarParsingError { variable_name, .. } if variable_name == "NIMBUS_REFRESH_INTERVAL"
        ));
    }

    #[test]
    fn test_log_color_parse_error() {
        let mut config = ExporterConfig::default();
        let err = apply_overrides_from(&mut config, lookup_from(&[("NIMBUS_LOG_COLOR", "yes")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvVarParsingError { variable_name, .. } if variable_name == "NIMBUS_LOG_COLOR"
        ));
    }

    #[test]
    fn test_kubeconfig_fallback() {
        let mut config = ExporterConfig::default();
        apply_overrides_from(&mut config, lookup_from(&[("KUBECONFIG", "/home/ops/.kube/config")]))
            .unwrap();
        assert_eq!(
            config.kubeconfig,
            Some(PathBuf::from("/home/ops/.kube/config"))
        );

        let mut config = ExporterConfig {
            kubeconfig: Some(PathBuf::from("/etc/kube.yaml")),
            ..Default::default()
        };
        apply_overrides_from(&mut config, lookup_from(&[("KUBECONFIG", "/other")])).unwrap();
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/etc/kube.yaml")));
    }
}
