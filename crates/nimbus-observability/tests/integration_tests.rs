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
//! Integration tests for logging setup
//!
//! The global subscriber can only be installed once per process, so a single
//! test covers installation and the second attempt.

use nimbus_observability::{init_tracing_with_config, LogConfig, LogFormat, LogOutput};

#[test]
fn test_config_builder_chaining() {
    let config = LogConfig::new()
        .with_format(LogFormat::Json)
        .with_level("debug")
        .with_color(false)
        .with_output(LogOutput::Stdout);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, Some("debug".to_string()));
    assert!(!config.use_color);
    assert_eq!(config.output, LogOutput::Stdout);
}

#[test]
fn test_explicit_level_overrides_env() {
    std::env::set_var("RUST_LOG", "trace");
    let config = LogConfig::new().with_level("warn");
    assert_eq!(config.get_effective_level(), "warn");
}

#[test]
fn test_install_subscriber_once() {
    // An unparsable filter fails before anything is installed
    let invalid = LogConfig::new().with_level("nimbus_exporter=notalevel");
    let err = init_tracing_with_config(invalid).unwrap_err();
    assert!(err.to_string().contains("Failed to parse log filter"));

    let config = LogConfig::new()
        .with_format(LogFormat::Compact)
        .with_level("info")
        .with_output(LogOutput::Stdout);
    assert!(init_tracing_with_config(config.clone()).is_ok());

    // A second global subscriber is rejected instead of panicking
    let err = init_tracing_with_config(config).unwrap_err();
    assert!(err.to_string().contains("Failed to install subscriber"));
}
