//! Command-line flags

use clap::Parser;
use nimbus_config::ExporterConfig;
use std::path::PathBuf;

/// Export OpenStack resource state, correlated with Kubernetes volumes, as
/// Prometheus metrics
#[derive(Parser, Debug, Default)]
#[command(name = "nimbus-exporter")]
#[command(version, about)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "PATH", env = "NIMBUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Interval between scrapes of the OpenStack API, in seconds
    #[arg(long, value_name = "SECONDS")]
    pub refresh_interval: Option<u64>,

    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    pub addr: Option<String>,

    /// Path to the cloud.conf file; the OS_* environment variables are used when unset
    #[arg(long, value_name = "PATH")]
    pub cloud_conf: Option<PathBuf>,

    /// Path to the kubeconfig file; in-cluster configuration is used when unset
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Prefix used for all metrics
    #[arg(long, value_name = "PREFIX")]
    pub metrics_prefix: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Log level or filter directives
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log destination (stderr, stdout)
    #[arg(long, value_name = "OUTPUT")]
    pub log_output: Option<String>,

    /// Colorize pretty and compact log output
    #[arg(long)]
    pub log_color: bool,
}

impl Cli {
    /// Overlay the flags that were given on `config`
    pub fn apply(&self, config: &mut ExporterConfig) {
        if let Some(interval) = self.refresh_interval {
            config.refresh_interval_secs = interval;
        }
        if let Some(addr) = &self.addr {
            config.listen_address = addr.clone();
        }
        if let Some(path) = &self.cloud_conf {
            config.cloud_conf = Some(path.clone());
        }
        if let Some(path) = &self.kubeconfig {
            config.kubeconfig = Some(path.clone());
        }
        if let Some(prefix) = &self.metrics_prefix {
            config.metrics_prefix = prefix.clone();
        }
        if let Some(format) = &self.log_format {
            config.log.format = format.clone();
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if let Some(output) = &self.log_output {
            config.log.output = output.clone();
        }
        if self.log_color {
            config.log.color = true;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "nimbus-exporter",
            "--refresh-interval",
            "30",
            "--addr",
            ":9999",
            "--metrics-prefix",
            "",
        ])
        .unwrap();

        let mut config = ExporterConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(config.bind_address(), "0.0.0.0:9999");
        assert_eq!(config.metrics_prefix, "");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.output, "stderr");
    }

    #[test]
    fn test_log_flags() {
        let cli = Cli::try_parse_from([
            "nimbus-exporter",
            "--log-format",
            "json",
            "--log-output",
            "stdout",
            "--log-color",
        ])
        .unwrap();

        let mut config = ExporterConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.log.format, "json");
        assert_eq!(config.log.output, "stdout");
        assert!(config.log.color);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = ExporterConfig {
            refresh_interval_secs: 300,
            ..Default::default()
        };
        Cli::default().apply(&mut config);
        assert_eq!(config.refresh_interval_secs, 300);
        assert_eq!(config.metrics_prefix, "kos");
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["nimbus-exporter", "--bogus"]).is_err());
    }
}
