//! Load balancers with their pools and pool members
//!
//! Pools and members are fetched one by one; a failed fetch is logged and
//! skipped while the parent keeps its series.

use async_trait::async_trait;
use nimbus_metrics::{bool_value, set_gauge, GaugeVec, MetricsRegistry, OneHot};
use nimbus_openstack::{ApiResult, CloudApi, LoadBalancer, Pool};
use tracing::warn;

use super::Domain;

/// Octavia provisioning states of a load balancer
pub const LB_PROVISIONING_STATES: &[&str] = &[
    "ALLOCATED",
    "BOOTING",
    "READY",
    "ACTIVE",
    "PENDING_DELETE",
    "PENDING_UPDATE",
    "PENDING_CREATE",
    "DELETED",
    "ERROR",
];

/// Provisioning states of pools and pool members
pub const POOL_PROVISIONING_STATES: &[&str] =
    &["ACTIVE", "PENDING_DELETE", "PENDING_CREATE", "PENDING_UPDATE", "ERROR"];

const LB_STATUS: OneHot = OneHot::new(LB_PROVISIONING_STATES);
const POOL_STATUS: OneHot = OneHot::new(POOL_PROVISIONING_STATES);

pub struct LoadBalancerDomain;

impl LoadBalancerDomain {
    async fn publish_pool(
        &self,
        lb_labels: &[&str],
        pool: &Pool,
        api: &dyn CloudApi,
        registry: &MetricsRegistry,
    ) {
        let families = &registry.load_balancer;
        let mut labels = lb_labels.to_vec();
        labels.extend_from_slice(&[pool.id.as_str(), pool.name.as_str()]);

        POOL_STATUS.publish(&families.pool_provisioning_status, &labels, &pool.provisioning_status);

        if pool.members.is_empty() {
            let mut row = labels.clone();
            row.extend_from_slice(&["", "", ""]);
            set_gauge(&families.member_provisioning_status, &row, 0.0);
        }
        for member_ref in &pool.members {
            let fetched = registry
                .requests
                .observe(
                    "loadbalancer_pool_member",
                    "get",
                    api.get_pool_member(&pool.id, &member_ref.id),
                )
                .await;
            let member = match fetched {
                Ok(member) => member,
                Err(e) => {
                    warn!(member = %member_ref.id, pool = %pool.id, error = %e, "Unable to get pool member");
                    continue;
                }
            };

            let mut member_labels = labels.clone();
            member_labels.extend_from_slice(&[member.id.as_str(), member.name.as_str()]);
            POOL_STATUS.publish(
                &families.member_provisioning_status,
                &member_labels,
                &member.provisioning_status,
            );
        }
    }
}

#[async_trait]
impl Domain for LoadBalancerDomain {
    type Entity = LoadBalancer;
    type Context = ();

    fn name(&self) -> &'static str {
        "load balancer"
    }

    fn resource(&self) -> &'static str {
        "loadbalancer"
    }

    fn families<'r>(&self, registry: &'r MetricsRegistry) -> Vec<&'r GaugeVec> {
        registry.load_balancer.resettable()
    }

    async fn list(&self, api: &dyn CloudApi) -> ApiResult<Vec<LoadBalancer>> {
        api.list_load_balancers().await
    }

    async fn publish(
        &self,
        lb: &LoadBalancer,
        _context: &(),
        api: &dyn CloudApi,
        registry: &MetricsRegistry,
    ) {
        let families = &registry.load_balancer;
        let labels = [
            lb.id.as_str(),
            lb.name.as_str(),
            lb.vip_address.as_str(),
            lb.provider.as_str(),
            lb.vip_port_id.as_str(),
        ];

        set_gauge(&families.admin_state_up, &labels, bool_value(lb.admin_state_up));
        LB_STATUS.publish(&families.provisioning_status, &labels, &lb.provisioning_status);

        if lb.pools.is_empty() {
            let mut row = labels.to_vec();
            row.extend_from_slice(&["", "", ""]);
            set_gauge(&families.pool_provisioning_status, &row, 0.0);
        }
        for pool_ref in &lb.pools {
            let fetched = registry
                .requests
                .observe("loadbalancer_pool", "get", api.get_pool(&pool_ref.id))
                .await;
            match fetched {
                Ok(pool) => self.publish_pool(&labels, &pool, api, registry).await,
                Err(e) => warn!(pool = %pool_ref.id, error = %e, "Unable to get pool"),
            }
        }
    }
}
