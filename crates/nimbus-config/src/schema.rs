use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Metric name prefix used when none is configured
pub const DEFAULT_METRICS_PREFIX: &str = "kos";

/// Top-level exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExporterConfig {
    /// Seconds between two scrapes of the OpenStack API
    pub refresh_interval_secs: u64,

    /// Address the metrics endpoint listens on (`host:port` or `:port`)
    pub listen_address: String,

    /// Path to a cloud.conf with a `[Global]` section; `OS_*` environment
    /// variables are used when unset
    pub cloud_conf: Option<PathBuf>,

    /// Path to a kubeconfig; in-cluster configuration is used when unset
    pub kubeconfig: Option<PathBuf>,

    /// Prefix for every exposed metric family, empty for none
    pub metrics_prefix: String,

    /// Retry timing after a failed cycle
    pub backoff: BackoffConfig,

    /// Logging settings
    pub log: LogSettings,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 120,
            listen_address: ":9183".to_string(),
            cloud_conf: None,
            kubeconfig: None,
            metrics_prefix: DEFAULT_METRICS_PREFIX.to_string(),
            backoff: BackoffConfig::default(),
            log: LogSettings::default(),
        }
    }
}

impl ExporterConfig {
    /// Refresh interval as a `Duration`
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Socket address to bind, expanding a bare `:port` to all interfaces
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }
}

/// Exponential backoff bounds applied between failed cycles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackoffConfig {
    /// Sleep after the first failure, and the value restored after a success
    pub initial_secs: u64,

    /// Upper bound for the doubled sleep
    pub max_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_secs: 1,
            max_secs: 3600,
        }
    }
}

impl BackoffConfig {
    pub fn initial(&self) -> Duration {
        Duration::from_secs(self.initial_secs)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// Level or filter directives, e.g. `info` or `warn,nimbus_exporter=debug`
    pub level: String,

    /// Log format (pretty, compact, json)
    pub format: String,

    /// Log destination (stderr, stdout)
    pub output: String,

    /// ANSI colors for pretty and compact output
    pub color: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            output: "stderr".to_string(),
            color: false,
        }
    }
}
