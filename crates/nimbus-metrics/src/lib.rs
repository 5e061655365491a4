//! Nimbus Metrics Module
//!
//! Prometheus metric families for OpenStack resources and the HTTP endpoint
//! that exposes them.
//!
//! # Features
//!
//! - **Per-domain families**: storage, floating IPs, load balancers, compute and firewalls
//! - **One-hot state gauges**: one series per known state, 1 for the current one
//! - **Request instrumentation**: latency, count and error metrics per API call
//! - **Consistent reads**: `/metrics` never observes a half-written cycle
//!
//! # Example
//!
//! ```no_run
//! use nimbus_metrics::{MetricsRegistry, MetricsServer, Snapshot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let snapshot = Snapshot::new(MetricsRegistry::new("kos")?);
//!
//!     let server = MetricsServer::bind("0.0.0.0:9183", snapshot.clone()).await?;
//!     tokio::spawn(server.serve());
//!
//!     let registry = snapshot.lock().await;
//!     registry.record_cycle(120, 1_700_000_000, 1.5, true);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod instrument;
pub mod registry;
pub mod server;
pub mod snapshot;

pub use error::{MetricsError, MetricsResult};
pub use instrument::RequestMetrics;
pub use registry::{bool_value, metric_name, set_gauge, MetricsRegistry, OneHot};
pub use server::{router, MetricsServer};
pub use snapshot::Snapshot;

// Re-export prometheus types for convenience
pub use prometheus::{Encoder, GaugeVec, TextEncoder};
