//! Nova servers and compute quotas

use async_trait::async_trait;
use nimbus_metrics::{set_gauge, GaugeVec, MetricsRegistry, OneHot};
use nimbus_openstack::{ApiResult, CloudApi, QuotaDetail, Server};

use super::{Domain, QUOTA_IN_USE, QUOTA_LIMIT, QUOTA_RESERVED};

/// Nova server states
pub const SERVER_STATES: &[&str] = &[
    "ACTIVE",
    "BUILDING",
    "PAUSED",
    "SUSPENDED",
    "STOPPED",
    "RESCUED",
    "RESIZED",
    "SOFT_DELETED",
    "DELETED",
    "ERROR",
    "SHELVED",
    "SHELVED_OFFLOADED",
];

const SERVER_STATUS: OneHot = OneHot::new(SERVER_STATES);

pub struct ComputeDomain;

fn publish_quota(family: &GaugeVec, detail: &QuotaDetail) {
    set_gauge(family, &[QUOTA_IN_USE], detail.in_use as f64);
    set_gauge(family, &[QUOTA_RESERVED], detail.reserved as f64);
    set_gauge(family, &[QUOTA_LIMIT], detail.limit as f64);
}

#[async_trait]
impl Domain for ComputeDomain {
    type Entity = Server;
    type Context = ();

    fn name(&self) -> &'static str {
        "compute"
    }

    fn resource(&self) -> &'static str {
        "server"
    }

    fn families<'r>(&self, registry: &'r MetricsRegistry) -> Vec<&'r GaugeVec> {
        registry.compute.resettable()
    }

    async fn list(&self, api: &dyn CloudApi) -> ApiResult<Vec<Server>> {
        api.list_servers().await
    }

    async fn publish(
        &self,
        server: &Server,
        _context: &(),
        _api: &dyn CloudApi,
        registry: &MetricsRegistry,
    ) {
        let families = &registry.compute;
        let labels = [server.id.as_str(), server.name.as_str()];

        set_gauge(
            &families.volume_attachment_count,
            &labels,
            server.volumes_attached.len() as f64,
        );
        for volume in &server.volumes_attached {
            set_gauge(
                &families.volume_attachment,
                &[labels[0], labels[1], volume.id.as_str()],
                1.0,
            );
        }

        SERVER_STATUS.publish(&families.server_status, &labels, &server.status);
    }

    async fn publish_summary(&self, api: &dyn CloudApi, registry: &MetricsRegistry) -> ApiResult<()> {
        let quota = registry
            .requests
            .observe("compute_quotasets_detail", "get", api.compute_quota_detail())
            .await?;

        let families = &registry.compute;
        publish_quota(&families.quota_cores, &quota.cores);
        publish_quota(&families.quota_floating_ips, &quota.floating_ips);
        publish_quota(&families.quota_instances, &quota.instances);
        publish_quota(&families.quota_ram, &quota.ram);
        publish_quota(&families.quota_server_group_members, &quota.server_group_members);
        Ok(())
    }
}
