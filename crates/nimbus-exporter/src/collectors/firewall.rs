//! Neutron FWaaS v1 firewalls and v2 firewall groups
//!
//! Both domains are gated on their Neutron extension (`fwaas`, `fwaas_v2`).

use async_trait::async_trait;
use nimbus_metrics::{bool_value, set_gauge, GaugeVec, MetricsRegistry, OneHot, RequestMetrics};
use nimbus_openstack::{ApiResult, Capability, CloudApi, FirewallGroupV2, FirewallV1};

use super::{probe_extension, Domain};

pub const FIREWALL_V1_STATES: &[&str] = &[
    "ACTIVE",
    "DOWN",
    "ERROR",
    "INACTIVE",
    "PENDING_CREATE",
    "PENDING_UPDATE",
    "PENDING_DELETE",
];

pub const FIREWALL_V2_STATES: &[&str] = &[
    "ACTIVE",
    "DOWN",
    "ERROR",
    "INACTIVE",
    "PENDING_CREATE",
    "PENDING_DELETE",
    "PENDING_UPDATE",
];

const FIREWALL_V1_STATUS: OneHot = OneHot::new(FIREWALL_V1_STATES);
const FIREWALL_V2_STATUS: OneHot = OneHot::new(FIREWALL_V2_STATES);

/// Groups with this name are created per project by Neutron and not exported
const DEFAULT_GROUP_NAME: &str = "default";

pub struct FirewallV1Domain;

#[async_trait]
impl Domain for FirewallV1Domain {
    type Entity = FirewallV1;
    type Context = ();

    fn name(&self) -> &'static str {
        "firewall v1"
    }

    fn resource(&self) -> &'static str {
        "firewall"
    }

    fn families<'r>(&self, registry: &'r MetricsRegistry) -> Vec<&'r GaugeVec> {
        registry.firewall_v1.resettable()
    }

    async fn capability(&self, api: &dyn CloudApi, requests: &RequestMetrics) -> ApiResult<Capability> {
        probe_extension(api, requests, "fwaas").await
    }

    async fn list(&self, api: &dyn CloudApi) -> ApiResult<Vec<FirewallV1>> {
        api.list_firewalls_v1().await
    }

    async fn publish(
        &self,
        fw: &FirewallV1,
        _context: &(),
        _api: &dyn CloudApi,
        registry: &MetricsRegistry,
    ) {
        let families = &registry.firewall_v1;
        let labels = [
            fw.id.as_str(),
            fw.name.as_str(),
            fw.description.as_str(),
            fw.firewall_policy_id.as_str(),
            fw.project(),
        ];

        set_gauge(&families.admin_state_up, &labels, bool_value(fw.admin_state_up));
        FIREWALL_V1_STATUS.publish(&families.status, &labels, &fw.status);
    }
}

pub struct FirewallV2Domain;

#[async_trait]
impl Domain for FirewallV2Domain {
    type Entity = FirewallGroupV2;
    type Context = ();

    fn name(&self) -> &'static str {
        "firewall v2"
    }

    fn resource(&self) -> &'static str {
        "firewallv2_group"
    }

    fn families<'r>(&self, registry: &'r MetricsRegistry) -> Vec<&'r GaugeVec> {
        registry.firewall_v2.resettable()
    }

    async fn capability(&self, api: &dyn CloudApi, requests: &RequestMetrics) -> ApiResult<Capability> {
        probe_extension(api, requests, "fwaas_v2").await
    }

    async fn list(&self, api: &dyn CloudApi) -> ApiResult<Vec<FirewallGroupV2>> {
        api.list_firewall_groups_v2().await
    }

    async fn publish(
        &self,
        group: &FirewallGroupV2,
        _context: &(),
        _api: &dyn CloudApi,
        registry: &MetricsRegistry,
    ) {
        if group.name == DEFAULT_GROUP_NAME {
            return;
        }

        let families = &registry.firewall_v2;
        let labels = [
            group.id.as_str(),
            group.name.as_str(),
            group.description.as_str(),
            group.ingress_firewall_policy_id.as_str(),
            group.egress_firewall_policy_id.as_str(),
            group.project(),
        ];

        set_gauge(&families.group_admin_state_up, &labels, bool_value(group.admin_state_up));
        FIREWALL_V2_STATUS.publish(&families.group_status, &labels, &group.status);
    }
}
