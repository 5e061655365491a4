//! Latency, count and error metrics for OpenStack API calls

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::future::Future;
use std::time::Instant;

use crate::error::MetricsResult;
use crate::registry::metric_name;

/// Request instrumentation, applied as a decorator around each API call
///
/// The `request` label is `<resource>_<verb>`, e.g. `server_list`.
#[derive(Clone)]
pub struct RequestMetrics {
    duration: HistogramVec,
    total: CounterVec,
    errors: CounterVec,
}

impl RequestMetrics {
    pub(crate) fn register(registry: &Registry, prefix: &str) -> MetricsResult<Self> {
        let duration = HistogramVec::new(
            HistogramOpts::new(
                metric_name(prefix, "openstack_api_request_duration_seconds"),
                "Latency of an OpenStack API call",
            ),
            &["request"],
        )?;
        registry.register(Box::new(duration.clone()))?;

        let total = CounterVec::new(
            Opts::new(
                metric_name(prefix, "openstack_api_requests_total"),
                "Total number of OpenStack API calls",
            ),
            &["request"],
        )?;
        registry.register(Box::new(total.clone()))?;

        let errors = CounterVec::new(
            Opts::new(
                metric_name(prefix, "openstack_api_request_errors_total"),
                "Total number of errors for an OpenStack API call",
            ),
            &["request"],
        )?;
        registry.register(Box::new(errors.clone()))?;

        Ok(RequestMetrics {
            duration,
            total,
            errors,
        })
    }

    /// Await `call`, recording its latency, the call and any error
    ///
    /// The result is returned unchanged.
    pub async fn observe<T, E, F>(&self, resource: &str, verb: &str, call: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let request = format!("{}_{}", resource, verb);
        let start = Instant::now();
        let result = call.await;

        self.duration
            .with_label_values(&[request.as_str()])
            .observe(start.elapsed().as_secs_f64());
        self.total.with_label_values(&[request.as_str()]).inc();
        if result.is_err() {
            self.errors.with_label_values(&[request.as_str()]).inc();
        }

        result
    }

    /// Calls recorded for `resource_verb`
    pub fn total(&self, request: &str) -> f64 {
        self.total.with_label_values(&[request]).get()
    }

    /// Failed calls recorded for `resource_verb`
    pub fn errors(&self, request: &str) -> f64 {
        self.errors.with_label_values(&[request]).get()
    }
}
