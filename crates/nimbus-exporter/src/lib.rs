//! Nimbus Exporter
//!
//! Polls OpenStack (Cinder, Neutron, Octavia, Nova, FWaaS), joins Cinder
//! volumes with the Kubernetes PersistentVolumes backed by them, and keeps the
//! result in a Prometheus registry served over HTTP.
//!
//! # Architecture
//!
//! - [`collectors`]: one [`Domain`](collectors::Domain) per resource kind,
//!   driven by the generic [`ResourceCollector`](collectors::ResourceCollector)
//! - [`correlator`]: PersistentVolume index keyed by Cinder volume id
//! - [`orchestrator`]: cycle sequencing, session handling and backoff
//!
//! # Example
//!
//! ```no_run
//! use nimbus_exporter::orchestrator::{Backoff, LiveClients, Orchestrator};
//! use nimbus_metrics::{MetricsRegistry, Snapshot};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let snapshot = Snapshot::new(MetricsRegistry::new("kos")?);
//!     let clients = LiveClients::default();
//!     Orchestrator::new(clients, snapshot, Duration::from_secs(120), Backoff::default())
//!         .run()
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod collectors;
pub mod correlator;
pub mod error;
pub mod orchestrator;

pub use collectors::{default_collectors, Collector, Domain, ResourceCollector};
pub use correlator::{build_index, KubeInventory, PvIndex, PvMetadata, StaticInventory, VolumeInventory};
pub use error::{CollectError, CorrelationError, CycleError};
pub use orchestrator::{run_cycle, Backoff, ClientFactory, CycleReport, LiveClients, Orchestrator, Session};
