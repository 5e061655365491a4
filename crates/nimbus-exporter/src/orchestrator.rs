//! Scrape cycle sequencing and backoff
//!
//! A session authenticates, then runs cycles on the refresh interval until a
//! cycle fails. The loop around sessions sleeps with exponential backoff and
//! starts over with freshly built clients.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nimbus_config::{BackoffConfig, OpenStackCredentials};
use nimbus_metrics::Snapshot;
use nimbus_openstack::{CloudApi, OpenStackClient};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::collectors::{default_collectors, Collector};
use crate::correlator::{KubeInventory, VolumeInventory};
use crate::error::{CollectError, CycleError};

/// Sleep between failed sessions, doubled per failure up to a ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    floor: Duration,
    ceiling: Duration,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Backoff {
            current: floor,
            floor,
            ceiling: ceiling.max(floor),
        }
    }

    /// Sleep that the next failure will apply
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Sleep to apply now; doubles the following one
    pub fn on_failure(&mut self) -> Duration {
        let sleep = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        sleep
    }

    pub fn on_success(&mut self) {
        self.current = self.floor;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(Duration::from_secs(1), Duration::from_secs(3600))
    }
}

impl From<&BackoffConfig> for Backoff {
    fn from(config: &BackoffConfig) -> Self {
        Backoff::new(config.initial(), config.max())
    }
}

/// Clients shared by every cycle of one session
#[derive(Clone)]
pub struct Session {
    pub api: Arc<dyn CloudApi>,
    pub inventory: Arc<dyn VolumeInventory>,
}

/// Builds the clients of a new session
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self) -> Result<Session, CycleError>;
}

/// Keystone-authenticated OpenStack client plus Kubernetes inventory
#[derive(Debug, Clone, Default)]
pub struct LiveClients {
    pub cloud_conf: Option<PathBuf>,
    pub kubeconfig: Option<PathBuf>,
}

#[async_trait]
impl ClientFactory for LiveClients {
    async fn connect(&self) -> Result<Session, CycleError> {
        let creds = OpenStackCredentials::resolve(self.cloud_conf.as_deref())
            .context("unable to read OpenStack credentials")
            .map_err(CycleError::ClientConstruction)?;

        let inventory = KubeInventory::connect(self.kubeconfig.as_deref())
            .await
            .context("error creating kubernetes client")
            .map_err(CycleError::ClientConstruction)?;

        let api = OpenStackClient::connect(creds).await?;

        Ok(Session {
            api: Arc::new(api),
            inventory: Arc::new(inventory),
        })
    }
}

/// Outcome of one scrape cycle
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub refresh_interval_secs: u64,
    pub failures: Vec<CollectError>,
}

impl CycleReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_result(self) -> Result<(), CycleError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(CycleError::Domains(self.failures))
        }
    }
}

/// Run every collector once with the snapshot held exclusively
///
/// Collectors run in order and a failing one does not stop the others.
pub async fn run_cycle(
    api: &dyn CloudApi,
    collectors: &[Box<dyn Collector>],
    snapshot: &Snapshot,
    refresh_interval_secs: u64,
) -> CycleReport {
    let registry = snapshot.lock().await;
    let started_at = Utc::now();
    let start = Instant::now();
    let mut failures = Vec::new();

    for collector in collectors {
        if let Err(e) = collector.collect(api, &registry).await {
            error!(domain = collector.name(), error = %e, "scraping {} metrics failed", collector.name());
            failures.push(e);
        }
    }

    let duration = start.elapsed();
    let succeeded = failures.is_empty();
    registry.record_cycle(
        refresh_interval_secs,
        started_at.timestamp(),
        duration.as_secs_f64(),
        succeeded,
    );
    drop(registry);

    info!(
        duration_ms = duration.as_millis() as u64,
        failed_domains = failures.len(),
        "Scrape cycle finished"
    );

    CycleReport {
        started_at,
        duration,
        refresh_interval_secs,
        failures,
    }
}

/// Drives sessions of scrape cycles forever
pub struct Orchestrator<F> {
    factory: F,
    snapshot: Snapshot,
    refresh_interval: Duration,
    backoff: Backoff,
}

impl<F: ClientFactory> Orchestrator<F> {
    pub fn new(factory: F, snapshot: Snapshot, refresh_interval: Duration, backoff: Backoff) -> Self {
        Orchestrator {
            factory,
            snapshot,
            refresh_interval,
            backoff,
        }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Loop over sessions, backing off after each failed one
    pub async fn run(mut self) {
        loop {
            let err = self.run_session().await;
            let sleep = self.backoff.on_failure();
            error!(error = %err, "error during run - sleeping {:?}", sleep);
            tokio::time::sleep(sleep).await;
        }
    }

    /// Connect, then cycle until a cycle fails
    pub async fn run_session(&mut self) -> CycleError {
        let session = match self.factory.connect().await {
            Ok(session) => session,
            Err(e) => return e,
        };
        info!(tenant_id = session.api.tenant_id(), "session started");
        let collectors = default_collectors(Arc::clone(&session.inventory));

        loop {
            let report = run_cycle(
                session.api.as_ref(),
                &collectors,
                &self.snapshot,
                self.refresh_interval.as_secs(),
            )
            .await;
            if let Err(e) = report.into_result() {
                return e;
            }

            self.backoff.on_success();
            tokio::time::sleep(self.refresh_interval).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::correlator::StaticInventory;
    use nimbus_metrics::MetricsRegistry;
    use nimbus_openstack::mock::MockCloud;
    use nimbus_openstack::ApiError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockClients {
        cloud: MockCloud,
        connects: Arc<AtomicUsize>,
        reject: bool,
    }

    impl MockClients {
        fn new(cloud: MockCloud) -> Self {
            MockClients {
                cloud,
                connects: Arc::new(AtomicUsize::new(0)),
                reject: false,
            }
        }
    }

    #[async_trait]
    impl ClientFactory for MockClients {
        async fn connect(&self) -> Result<Session, CycleError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(ApiError::auth("rejected").into());
            }
            Ok(Session {
                api: Arc::new(self.cloud.clone()),
                inventory: Arc::new(StaticInventory::default()),
            })
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(MetricsRegistry::new("kos").unwrap())
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(5));
        let sleeps: Vec<u64> = (0..5).map(|_| backoff.on_failure().as_secs()).collect();
        assert_eq!(sleeps, vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn test_backoff_resets_on_success() {
        let mut backoff = Backoff::default();
        backoff.on_failure();
        backoff.on_failure();
        assert_eq!(backoff.current(), Duration::from_secs(4));
        backoff.on_success();
        assert_eq!(backoff.current(), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_from_config() {
        let backoff = Backoff::from(&BackoffConfig {
            initial_secs: 2,
            max_secs: 60,
        });
        assert_eq!(backoff.current(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_authentication_failure_ends_session() {
        let mut clients = MockClients::new(MockCloud::new());
        clients.reject = true;
        let mut orchestrator =
            Orchestrator::new(clients, snapshot(), Duration::from_secs(120), Backoff::default());

        let err = orchestrator.run_session().await;
        assert!(matches!(err, CycleError::Authentication(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_runs_until_cycle_fails() {
        let cloud = MockCloud::new();
        let snapshot = snapshot();
        let mut orchestrator = Orchestrator::new(
            MockClients::new(cloud.clone()),
            snapshot.clone(),
            Duration::from_secs(120),
            Backoff::new(Duration::from_secs(8), Duration::from_secs(60)),
        );
        orchestrator.backoff.on_failure();

        let breaker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            cloud.fail("list_servers").await;
        });

        let err = orchestrator.run_session().await;
        breaker.await.unwrap();

        match err {
            CycleError::Domains(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].domain(), "compute");
            }
            other => panic!("unexpected error: {}", other),
        }
        // the first cycle succeeded and restored the floor
        assert_eq!(orchestrator.backoff().current(), Duration::from_secs(8));
        assert_eq!(orchestrator.factory.connects.load(Ordering::SeqCst), 1);

        let text = snapshot.render().await.unwrap();
        assert!(text.contains("kos_scrape_status_succeeded{refresh_interval=\"120\"} 0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sessions_reconnect_after_backoff() {
        let cloud = MockCloud::new();
        cloud.fail("list_servers").await;
        let clients = MockClients::new(cloud);
        let connects = Arc::clone(&clients.connects);
        let snapshot = snapshot();

        let orchestrator = Orchestrator::new(
            clients,
            snapshot.clone(),
            Duration::from_secs(120),
            Backoff::new(Duration::from_secs(1), Duration::from_secs(4)),
        );
        let handle = tokio::spawn(orchestrator.run());

        // sessions start at t=0, t=1 (after 1s) and t=3 (after 2s more);
        // samples sit between those instants
        tokio::time::sleep(Duration::from_millis(250)).await;
        let mut samples = Vec::new();
        for _ in 0..12 {
            samples.push(connects.load(Ordering::SeqCst));

            // the snapshot is free while the loop sleeps
            let render = tokio::time::timeout(Duration::from_millis(10), snapshot.render()).await;
            assert!(render.is_ok(), "render blocked during backoff");

            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        handle.abort();

        assert_eq!(samples, vec![1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3]);

        let text = snapshot.render().await.unwrap();
        assert!(text.contains("kos_scrape_status_succeeded{refresh_interval=\"120\"} 0"));
    }
}
