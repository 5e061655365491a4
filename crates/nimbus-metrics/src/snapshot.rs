//! Exclusive access to the registry across a scrape cycle

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::MetricsResult;
use crate::MetricsRegistry;

/// Shared handle serializing scrape cycles against exposition reads
///
/// A cycle holds the guard from its first reset to its last write, so a
/// reader never observes a half-populated domain.
#[derive(Clone)]
pub struct Snapshot {
    inner: Arc<Mutex<MetricsRegistry>>,
}

impl Snapshot {
    pub fn new(registry: MetricsRegistry) -> Self {
        Snapshot {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Wait for exclusive access to the registry
    pub async fn lock(&self) -> MutexGuard<'_, MetricsRegistry> {
        self.inner.lock().await
    }

    /// Encode the current registry contents under the guard
    pub async fn render(&self) -> MetricsResult<String> {
        self.inner.lock().await.render()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::set_gauge;
    use std::time::Duration;

    #[tokio::test]
    async fn test_render_waits_for_cycle() {
        let snapshot = Snapshot::new(MetricsRegistry::new("kos").unwrap());

        let guard = snapshot.lock().await;
        set_gauge(&guard.compute.quota_cores, &["limit"], 10.0);

        let reader = snapshot.clone();
        let render = tokio::spawn(async move { reader.render().await.unwrap() });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!render.is_finished());

        set_gauge(&guard.compute.quota_cores, &["in-use"], 4.0);
        drop(guard);

        let text = render.await.unwrap();
        assert!(text.contains("kos_compute_quota_cores{quota_type=\"limit\"} 10"));
        assert!(text.contains("kos_compute_quota_cores{quota_type=\"in-use\"} 4"));
    }
}
