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
//! Logging initialization and setup.
//!
//! Installs the global tracing subscriber for the exporter process.

use crate::config::{LogConfig, LogError, LogFormat, LogOutput};
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Install the global tracing subscriber described by `config`.
///
/// # Example
///
/// ```ignore
/// use nimbus_observability::{init_tracing_with_config, LogConfig, LogFormat, LogOutput};
///
/// let config = LogConfig::new()
///     .with_format(LogFormat::Json)
///     .with_output(LogOutput::Stdout);
/// init_tracing_with_config(config).unwrap();
/// tracing::info!("exporter starting");
/// ```
///
/// Fails if the level filter does not parse or a global subscriber is
/// already installed.
pub fn init_tracing_with_config(config: LogConfig) -> Result<(), LogError> {
    let env_filter = build_env_filter(&config)?;
    let registry = Registry::default().with(env_filter);
    let writer = get_writer(&config.output);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(config.use_color)
                    .pretty(),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(config.use_color)
                    .with_target(true)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().with_writer(writer).json().with_target(true))
            .try_init(),
    };

    result.map_err(|e| LogError::ConfigError(format!("Failed to install subscriber: {}", e)))
}

/// Get the writer for the specified output
fn get_writer(output: &LogOutput) -> fn() -> Box<dyn io::Write + Send> {
    match output {
        LogOutput::Stderr => || Box::new(io::stderr()),
        LogOutput::Stdout => || Box::new(io::stdout()),
    }
}

/// Build an environment filter for the given configuration
fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let level_str = config.get_effective_level();

    EnvFilter::try_new(&level_str).map_err(|e| {
        LogError::ConfigError(format!("Failed to parse log filter '{}': {}", level_str, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests that install the global subscriber live in tests/integration_tests.rs,
    // a global default can only be set once per process.

    #[test]
    fn test_env_filter_parsing() {
        let result = build_env_filter(&LogConfig::new().with_level("debug"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_level_rejected() {
        let result = build_env_filter(&LogConfig::new().with_level("nimbus_exporter=notalevel"));
        assert!(matches!(
            result,
            Err(LogError::ConfigError(message)) if message.contains("Failed to parse log filter")
        ));
    }

    #[test]
    fn test_directive_filter() {
        let result =
            build_env_filter(&LogConfig::new().with_level("warn,nimbus_exporter=debug"));
        assert!(result.is_ok());
    }
}
