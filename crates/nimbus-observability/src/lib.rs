//! nimbus observability
//!
//! Structured logging for the exporter, built on `tracing` and
//! `tracing-subscriber`.
//!
//! - **Output formats**: pretty, compact and JSON
//! - **Destinations**: stderr or stdout
//! - **Filtering**: explicit level directives, falling back to `RUST_LOG`
//!
//! # Example
//!
//! ```ignore
//! use nimbus_observability::{init_tracing_with_config, LogConfig, LogFormat};
//!
//! init_tracing_with_config(LogConfig::new().with_format(LogFormat::Json))?;
//! tracing::info!("exporter started");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::init_tracing_with_config;
