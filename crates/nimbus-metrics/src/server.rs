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
//! HTTP server for the Prometheus metrics endpoint
//!
//! Exposes `/metrics` in the Prometheus text exposition format and a
//! `/healthz` liveness probe.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::TEXT_FORMAT;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::{MetricsError, MetricsResult};
use crate::Snapshot;

/// Build the exposition router
pub fn router(snapshot: Snapshot) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(health_handler))
        .with_state(snapshot)
}

/// Bound exposition server
///
/// Binding happens up front so a busy port is reported before the scrape
/// loop starts.
pub struct MetricsServer {
    listener: TcpListener,
    snapshot: Snapshot,
}

impl MetricsServer {
    /// Bind the listener for `addr`
    pub async fn bind(addr: &str, snapshot: Snapshot) -> MetricsResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| MetricsError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Metrics server listening on http://{}/metrics", addr);
        Ok(MetricsServer { listener, snapshot })
    }

    /// Address actually bound, useful with port 0
    pub fn local_addr(&self) -> MetricsResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the listener fails
    pub async fn serve(self) -> MetricsResult<()> {
        axum::serve(self.listener, router(self.snapshot)).await?;
        Ok(())
    }
}

/// Handler for `/metrics` endpoint
async fn metrics_handler(State(snapshot): State<Snapshot>) -> Response {
    debug!("Serving metrics");

    match snapshot.render().await {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Handler for `/healthz` endpoint
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::MetricsRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn snapshot() -> Snapshot {
        Snapshot::new(MetricsRegistry::new("kos").unwrap())
    }

    #[tokio::test]
    async fn test_healthz() {
        let response = router(snapshot())
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_metrics_content_type() {
        let snapshot = snapshot();
        snapshot.lock().await.record_cycle(60, 1_700_000_000, 0.5, false);

        let response = router(snapshot)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            TEXT_FORMAT
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("kos_scrape_status_succeeded{refresh_interval=\"60\"} 0"));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let response = router(snapshot())
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let first = MetricsServer::bind("127.0.0.1:0", snapshot()).await.unwrap();
        let addr = first.local_addr().unwrap().to_string();
        let second = MetricsServer::bind(&addr, snapshot()).await;
        assert!(matches!(second, Err(MetricsError::Bind { .. })));
    }
}
