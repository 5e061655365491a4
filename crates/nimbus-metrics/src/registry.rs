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
//! Metric families exported for the OpenStack resources
//!
//! Every family is built and registered once, in a private
//! [`prometheus::Registry`], with names of the form `[<prefix>_]<suffix>`.
//! Families are grouped per domain; each group knows which of its families
//! are cleared before a domain is repopulated.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::error::{MetricsError, MetricsResult};
use crate::instrument::RequestMetrics;

/// Base labels of every per-volume family
pub const VOLUME_LABELS: &[&str] = &[
    "id",
    "description",
    "name",
    "status",
    "cinder_availability_zone",
    "volume_type",
    "pvc_name",
    "pvc_namespace",
    "pv_name",
    "pv_storage_class",
    "pv_reclaim_policy",
    "pv_fs_type",
];

/// Position of the `status` label within [`VOLUME_LABELS`]
pub const VOLUME_STATUS_POSITION: usize = 3;

pub const FLOATING_IP_LABELS: &[&str] = &["id", "floating_ip", "fixed_ip", "port_id"];
pub const LOAD_BALANCER_LABELS: &[&str] = &["id", "name", "vip_address", "provider", "port_id"];
pub const POOL_LABELS: &[&str] = &["pool_id", "pool_name"];
pub const POOL_MEMBER_LABELS: &[&str] = &["member_id", "member_name"];
pub const SERVER_LABELS: &[&str] = &["id", "name"];
pub const FIREWALL_V1_LABELS: &[&str] = &["id", "name", "description", "policyID", "projectID"];
pub const FIREWALL_V2_LABELS: &[&str] = &[
    "id",
    "name",
    "description",
    "ingressPolicyID",
    "egressPolicyID",
    "projectID",
];

const QUOTA_LABELS: &[&str] = &["quota_type"];
const CYCLE_LABELS: &[&str] = &["refresh_interval"];

/// Full metric name for `suffix` under `prefix`
///
/// An empty prefix leaves the suffix untouched.
pub fn metric_name(prefix: &str, suffix: &str) -> String {
    if prefix.is_empty() {
        suffix.to_string()
    } else {
        format!("{}_{}", prefix, suffix).to_lowercase()
    }
}

/// Upsert one series, dropping it with a warning on a label arity mismatch
pub fn set_gauge(family: &GaugeVec, labels: &[&str], value: f64) {
    match family.get_metric_with_label_values(labels) {
        Ok(gauge) => gauge.set(value),
        Err(e) => warn!(error = %e, "dropping sample with mismatched labels"),
    }
}

/// One-hot encoding of a finite state field
///
/// Publishes one series per known state: 1 for the current state, 0 for every
/// sibling. A current state outside the enumeration yields all zeros.
#[derive(Debug, Clone, Copy)]
pub struct OneHot {
    states: &'static [&'static str],
}

impl OneHot {
    pub const fn new(states: &'static [&'static str]) -> Self {
        OneHot { states }
    }

    pub fn states(&self) -> &'static [&'static str] {
        self.states
    }

    /// Publish with the state label appended after `labels`
    pub fn publish(&self, family: &GaugeVec, labels: &[&str], current: &str) {
        self.publish_at(family, labels, labels.len(), current);
    }

    /// Publish with the state label inserted at `position`
    pub fn publish_at(&self, family: &GaugeVec, labels: &[&str], position: usize, current: &str) {
        let slot = position.min(labels.len());
        let mut values: Vec<&str> = Vec::with_capacity(labels.len() + 1);
        values.extend_from_slice(labels);
        values.insert(slot, "");

        for &state in self.states {
            values[slot] = state;
            set_gauge(family, &values, bool_value(state == current));
        }
    }
}

/// 1.0 for true, 0.0 for false
pub fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

struct Builder<'a> {
    registry: &'a Registry,
    prefix: &'a str,
}

impl Builder<'_> {
    fn gauge(&self, suffix: &str, help: &str, labels: &[&str]) -> MetricsResult<GaugeVec> {
        let family = GaugeVec::new(Opts::new(metric_name(self.prefix, suffix), help), labels)?;
        self.registry.register(Box::new(family.clone()))?;
        Ok(family)
    }
}

fn join(parts: &[&[&'static str]]) -> Vec<&'static str> {
    parts.iter().flat_map(|p| p.iter().copied()).collect()
}

/// Cinder volume families
#[derive(Clone)]
pub struct StorageFamilies {
    pub quota_volumes: GaugeVec,
    pub quota_gigabytes: GaugeVec,
    pub created_at: GaugeVec,
    pub updated_at: GaugeVec,
    pub status: GaugeVec,
    pub size: GaugeVec,
    pub attached_at: GaugeVec,
}

impl StorageFamilies {
    fn build(b: &Builder<'_>) -> MetricsResult<Self> {
        Ok(StorageFamilies {
            quota_volumes: b.gauge(
                "cinder_quota_volume_disks",
                "Cinder volume metric (number of volumes)",
                QUOTA_LABELS,
            )?,
            quota_gigabytes: b.gauge(
                "cinder_quota_volume_disk_gigabytes",
                "Cinder volume metric (GB)",
                QUOTA_LABELS,
            )?,
            created_at: b.gauge("cinder_volume_created_at", "Cinder volume created at", VOLUME_LABELS)?,
            updated_at: b.gauge("cinder_volume_updated_at", "Cinder volume updated at", VOLUME_LABELS)?,
            status: b.gauge("cinder_volume_status", "Cinder volume status", VOLUME_LABELS)?,
            size: b.gauge("cinder_volume_size", "Cinder volume size", VOLUME_LABELS)?,
            attached_at: b.gauge(
                "cinder_volume_attached_at",
                "Cinder volume attached at",
                &join(&[VOLUME_LABELS, &["server_id", "device", "hostname"]]),
            )?,
        })
    }

    /// Per-volume families; quotas are static and kept
    pub fn resettable(&self) -> Vec<&GaugeVec> {
        vec![
            &self.created_at,
            &self.updated_at,
            &self.status,
            &self.size,
            &self.attached_at,
        ]
    }
}

/// Neutron floating IP families
#[derive(Clone)]
pub struct FloatingIpFamilies {
    pub status: GaugeVec,
    pub created_at: GaugeVec,
    pub updated_at: GaugeVec,
}

impl FloatingIpFamilies {
    fn build(b: &Builder<'_>) -> MetricsResult<Self> {
        Ok(FloatingIpFamilies {
            status: b.gauge(
                "neutron_floating_ip_status",
                "Neutron floating ip status",
                &join(&[FLOATING_IP_LABELS, &["status"]]),
            )?,
            created_at: b.gauge(
                "neutron_floatingip_created_at",
                "Neutron floating ip created at",
                FLOATING_IP_LABELS,
            )?,
            updated_at: b.gauge(
                "neutron_floatingip_updated_at",
                "Neutron floating ip updated at",
                FLOATING_IP_LABELS,
            )?,
        })
    }

    pub fn resettable(&self) -> Vec<&GaugeVec> {
        vec![&self.status, &self.created_at, &self.updated_at]
    }
}

/// Load balancer, pool and member families
#[derive(Clone)]
pub struct LoadBalancerFamilies {
    pub admin_state_up: GaugeVec,
    pub provisioning_status: GaugeVec,
    pub pool_provisioning_status: GaugeVec,
    pub member_provisioning_status: GaugeVec,
}

impl LoadBalancerFamilies {
    fn build(b: &Builder<'_>) -> MetricsResult<Self> {
        Ok(LoadBalancerFamilies {
            admin_state_up: b.gauge(
                "loadbalancer_admin_state_up",
                "Load balancer admin state up",
                LOAD_BALANCER_LABELS,
            )?,
            provisioning_status: b.gauge(
                "loadbalancer_provisioning_status",
                "Load balancer status",
                &join(&[LOAD_BALANCER_LABELS, &["provisioning_status"]]),
            )?,
            pool_provisioning_status: b.gauge(
                "loadbalancer_pool_provisioning_status",
                "Load balancer pool provisioning status",
                &join(&[LOAD_BALANCER_LABELS, POOL_LABELS, &["pool_provisioning_status"]]),
            )?,
            member_provisioning_status: b.gauge(
                "loadbalancer_pool_member_provisioning_status",
                "Load balancer pool member provisioning status",
                &join(&[
                    LOAD_BALANCER_LABELS,
                    POOL_LABELS,
                    POOL_MEMBER_LABELS,
                    &["pool_member_provisioning_status"],
                ]),
            )?,
        })
    }

    pub fn resettable(&self) -> Vec<&GaugeVec> {
        vec![
            &self.admin_state_up,
            &self.provisioning_status,
            &self.pool_provisioning_status,
            &self.member_provisioning_status,
        ]
    }
}

/// Nova server and compute quota families
#[derive(Clone)]
pub struct ComputeFamilies {
    pub quota_cores: GaugeVec,
    pub quota_floating_ips: GaugeVec,
    pub quota_instances: GaugeVec,
    pub quota_ram: GaugeVec,
    pub quota_server_group_members: GaugeVec,
    pub server_status: GaugeVec,
    pub volume_attachment: GaugeVec,
    pub volume_attachment_count: GaugeVec,
}

impl ComputeFamilies {
    fn build(b: &Builder<'_>) -> MetricsResult<Self> {
        Ok(ComputeFamilies {
            quota_cores: b.gauge("compute_quota_cores", "Number of instance cores allowed", QUOTA_LABELS)?,
            quota_floating_ips: b.gauge(
                "compute_quota_floating_ips",
                "Number of floating IPs allowed",
                QUOTA_LABELS,
            )?,
            quota_instances: b.gauge(
                "compute_quota_instances",
                "Number of instances (servers) allowed",
                QUOTA_LABELS,
            )?,
            quota_ram: b.gauge("compute_quota_ram_megabytes", "RAM (in MB) allowed", QUOTA_LABELS)?,
            quota_server_group_members: b.gauge(
                "compute_quota_server_group_members",
                "Number of members allowed per server group",
                QUOTA_LABELS,
            )?,
            server_status: b.gauge(
                "server_status",
                "Server status",
                &join(&[SERVER_LABELS, &["status"]]),
            )?,
            volume_attachment: b.gauge(
                "server_volume_attachment",
                "Server volume attachment",
                &join(&[SERVER_LABELS, &["volume_id"]]),
            )?,
            volume_attachment_count: b.gauge(
                "server_volume_attachment_count",
                "Server volume attachment count",
                SERVER_LABELS,
            )?,
        })
    }

    /// Per-server families; quotas are static and kept
    pub fn resettable(&self) -> Vec<&GaugeVec> {
        vec![
            &self.server_status,
            &self.volume_attachment,
            &self.volume_attachment_count,
        ]
    }
}

/// FWaaS v1 families
#[derive(Clone)]
pub struct FirewallV1Families {
    pub admin_state_up: GaugeVec,
    pub status: GaugeVec,
}

impl FirewallV1Families {
    fn build(b: &Builder<'_>) -> MetricsResult<Self> {
        Ok(FirewallV1Families {
            admin_state_up: b.gauge(
                "firewall_v1_admin_state_up",
                "Firewall v1 admin state up",
                FIREWALL_V1_LABELS,
            )?,
            status: b.gauge(
                "firewall_v1_status",
                "Firewall v1 status",
                &join(&[FIREWALL_V1_LABELS, &["status"]]),
            )?,
        })
    }

    pub fn resettable(&self) -> Vec<&GaugeVec> {
        vec![&self.admin_state_up, &self.status]
    }
}

/// FWaaS v2 firewall group families
#[derive(Clone)]
pub struct FirewallV2Families {
    pub group_admin_state_up: GaugeVec,
    pub group_status: GaugeVec,
}

impl FirewallV2Families {
    fn build(b: &Builder<'_>) -> MetricsResult<Self> {
        Ok(FirewallV2Families {
            group_admin_state_up: b.gauge(
                "firewall_v2_group_admin_state_up",
                "Firewall v2 group admin state up",
                FIREWALL_V2_LABELS,
            )?,
            group_status: b.gauge(
                "firewall_v2_group_status",
                "Firewall v2 group status",
                &join(&[FIREWALL_V2_LABELS, &["status"]]),
            )?,
        })
    }

    pub fn resettable(&self) -> Vec<&GaugeVec> {
        vec![&self.group_admin_state_up, &self.group_status]
    }
}

/// Gauges describing the last scrape cycle
#[derive(Clone)]
pub struct CycleFamilies {
    pub scrape_duration: GaugeVec,
    pub scraped_at: GaugeVec,
    pub scrape_status_succeeded: GaugeVec,
}

impl CycleFamilies {
    fn build(b: &Builder<'_>) -> MetricsResult<Self> {
        Ok(CycleFamilies {
            scrape_duration: b.gauge(
                "scrape_duration",
                "Time in seconds needed for the last scrape",
                CYCLE_LABELS,
            )?,
            scraped_at: b.gauge(
                "scraped_at",
                "Timestamp when last scrape started",
                CYCLE_LABELS,
            )?,
            scrape_status_succeeded: b.gauge(
                "scrape_status_succeeded",
                "Scrape status succeeded",
                CYCLE_LABELS,
            )?,
        })
    }
}

/// Every metric family the exporter publishes
///
/// Built once at startup with the configured prefix. Holds no lock of its
/// own; the scrape cycle and the exposition endpoint serialize through
/// [`Snapshot`](crate::Snapshot).
pub struct MetricsRegistry {
    registry: Registry,
    prefix: String,
    pub storage: StorageFamilies,
    pub floating_ip: FloatingIpFamilies,
    pub load_balancer: LoadBalancerFamilies,
    pub compute: ComputeFamilies,
    pub firewall_v1: FirewallV1Families,
    pub firewall_v2: FirewallV2Families,
    pub cycle: CycleFamilies,
    pub requests: RequestMetrics,
}

impl MetricsRegistry {
    /// Build and register every family under `prefix`
    pub fn new(prefix: &str) -> MetricsResult<Self> {
        let registry = Registry::new();
        let b = Builder {
            registry: &registry,
            prefix,
        };

        let storage = StorageFamilies::build(&b)?;
        let floating_ip = FloatingIpFamilies::build(&b)?;
        let load_balancer = LoadBalancerFamilies::build(&b)?;
        let compute = ComputeFamilies::build(&b)?;
        let firewall_v1 = FirewallV1Families::build(&b)?;
        let firewall_v2 = FirewallV2Families::build(&b)?;
        let cycle = CycleFamilies::build(&b)?;
        let requests = RequestMetrics::register(&registry, prefix)?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(MetricsRegistry {
            registry,
            prefix: prefix.to_string(),
            storage,
            floating_ip,
            load_balancer,
            compute,
            firewall_v1,
            firewall_v2,
            cycle,
            requests,
        })
    }

    /// Prefix the families were registered with
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Get reference to the underlying Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Clear every series of the given families
    pub fn reset(&self, families: &[&GaugeVec]) {
        for family in families {
            family.reset();
        }
    }

    /// Record the outcome of one scrape cycle
    pub fn record_cycle(&self, refresh_interval_secs: u64, started_at: i64, duration_secs: f64, succeeded: bool) {
        let interval = refresh_interval_secs.to_string();
        let labels = [interval.as_str()];
        set_gauge(&self.cycle.scrape_duration, &labels, duration_secs);
        set_gauge(&self.cycle.scraped_at, &labels, started_at as f64);
        set_gauge(&self.cycle.scrape_status_succeeded, &labels, bool_value(succeeded));
    }

    /// Encode every family in the Prometheus text format
    pub fn render(&self) -> MetricsResult<String> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STATES: &[&str] = &["ACTIVE", "DOWN", "ERROR"];

    #[test]
    fn test_metric_name() {
        assert_eq!(metric_name("kos", "server_status"), "kos_server_status");
        assert_eq!(metric_name("KOS", "server_status"), "kos_server_status");
        assert_eq!(metric_name("", "server_status"), "server_status");
    }

    #[test]
    fn test_registry_creation_with_prefix() {
        let registry = MetricsRegistry::new("kos").unwrap();
        registry.record_cycle(120, 1_700_000_000, 2.5, true);

        let text = registry.render().unwrap();
        assert!(text.contains("kos_scrape_duration{refresh_interval=\"120\"} 2.5"));
        assert!(text.contains("kos_scrape_status_succeeded{refresh_interval=\"120\"} 1"));
    }

    #[test]
    fn test_two_registries_do_not_collide() {
        assert!(MetricsRegistry::new("kos").is_ok());
        assert!(MetricsRegistry::new("kos").is_ok());
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        assert!(MetricsRegistry::new("not-valid").is_err());
    }

    #[test]
    fn test_one_hot_appended() {
        let registry = MetricsRegistry::new("").unwrap();
        let family = &registry.floating_ip.status;
        OneHot::new(STATES).publish(family, &["fip-1", "1.2.3.4", "10.0.0.5", "port-1"], "DOWN");

        let value = |state: &str| {
            family
                .get_metric_with_label_values(&["fip-1", "1.2.3.4", "10.0.0.5", "port-1", state])
                .unwrap()
                .get()
        };
        assert_eq!(value("ACTIVE"), 0.0);
        assert_eq!(value("DOWN"), 1.0);
        assert_eq!(value("ERROR"), 0.0);
    }

    #[test]
    fn test_one_hot_inserted() {
        let registry = MetricsRegistry::new("").unwrap();
        let family = &registry.storage.status;
        let labels = ["vol-1", "", "data", "", "", "", "", "", "", "", ""];
        OneHot::new(&["available", "in-use"]).publish_at(
            family,
            &labels,
            VOLUME_STATUS_POSITION,
            "in-use",
        );

        let gauge = family
            .get_metric_with_label_values(&["vol-1", "", "data", "in-use", "", "", "", "", "", "", "", ""])
            .unwrap();
        assert_eq!(gauge.get(), 1.0);
    }

    #[test]
    fn test_mismatched_labels_dropped() {
        let registry = MetricsRegistry::new("").unwrap();
        set_gauge(&registry.compute.volume_attachment_count, &["only-one"], 1.0);
        assert!(!registry.render().unwrap().contains("server_volume_attachment_count{"));
    }

    #[test]
    fn test_reset_clears_series() {
        let registry = MetricsRegistry::new("kos").unwrap();
        set_gauge(&registry.compute.volume_attachment_count, &["srv-1", "web"], 2.0);
        set_gauge(&registry.compute.quota_cores, &["limit"], 20.0);

        registry.reset(&registry.compute.resettable());

        let text = registry.render().unwrap();
        assert!(!text.contains("srv-1"));
        assert!(text.contains("kos_compute_quota_cores{quota_type=\"limit\"} 20"));
    }
}
