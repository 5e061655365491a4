// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 winnyboy5

//! Integration tests for nimbus-metrics crate
//!
//! Exercises the exposition endpoint over a real socket and the naming of
//! every family group under a prefix.

use nimbus_metrics::{set_gauge, MetricsRegistry, MetricsServer, OneHot, Snapshot};
use std::time::Duration;

const FIP_STATES: &[&str] = &["ACTIVE", "DOWN", "ERROR"];

async fn start(snapshot: Snapshot) -> String {
    let server = MetricsServer::bind("127.0.0.1:0", snapshot).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    format!("http://{}", addr)
}

#[test]
fn test_family_names_use_prefix() {
    let registry = MetricsRegistry::new("kos").unwrap();
    set_gauge(&registry.storage.quota_volumes, &["limit"], 10.0);
    set_gauge(&registry.compute.quota_ram, &["in-use"], 2048.0);
    set_gauge(&registry.load_balancer.admin_state_up, &["lb-1", "web", "10.0.0.1", "octavia", "port-1"], 1.0);
    set_gauge(
        &registry.firewall_v2.group_admin_state_up,
        &["fwg-1", "edge", "", "pol-in", "pol-out", "p-1"],
        1.0,
    );

    let text = registry.render().unwrap();
    assert!(text.contains("kos_cinder_quota_volume_disks{quota_type=\"limit\"} 10"));
    assert!(text.contains("kos_compute_quota_ram_megabytes{quota_type=\"in-use\"} 2048"));
    assert!(text.contains("kos_loadbalancer_admin_state_up{"));
    assert!(text.contains("ingressPolicyID=\"pol-in\""));
}

#[test]
fn test_empty_prefix() {
    let registry = MetricsRegistry::new("").unwrap();
    set_gauge(&registry.compute.volume_attachment_count, &["srv-1", "web"], 0.0);
    let text = registry.render().unwrap();
    assert!(text.contains("\nserver_volume_attachment_count{id=\"srv-1\",name=\"web\"} 0"));
}

#[tokio::test]
async fn test_metrics_over_http() {
    let snapshot = Snapshot::new(MetricsRegistry::new("kos").unwrap());
    {
        let registry = snapshot.lock().await;
        OneHot::new(FIP_STATES).publish(
            &registry.floating_ip.status,
            &["fip-1", "1.2.3.4", "", ""],
            "ACTIVE",
        );
    }

    let base = start(snapshot).await;
    let body = reqwest::get(format!("{}/metrics", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let value = |state: &str| {
        body.lines()
            .find(|line| {
                line.starts_with("kos_neutron_floating_ip_status{")
                    && line.contains("floating_ip=\"1.2.3.4\"")
                    && line.contains(&format!("status=\"{}\"", state))
            })
            .and_then(|line| line.rsplit(' ').next())
            .map(str::to_string)
    };
    assert_eq!(value("ACTIVE").as_deref(), Some("1"));
    assert_eq!(value("DOWN").as_deref(), Some("0"));
    assert_eq!(value("ERROR").as_deref(), Some("0"));
}

#[tokio::test]
async fn test_healthz_over_http() {
    let base = start(Snapshot::new(MetricsRegistry::new("kos").unwrap())).await;
    let response = reqwest::get(format!("{}/healthz", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_healthz_served_during_cycle() {
    let snapshot = Snapshot::new(MetricsRegistry::new("kos").unwrap());
    let base = start(snapshot.clone()).await;

    let _cycle = snapshot.lock().await;
    let response = tokio::time::timeout(
        Duration::from_secs(5),
        reqwest::get(format!("{}/healthz", base)),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(response.status(), 200);
}
