//! Neutron floating IPs

use async_trait::async_trait;
use nimbus_metrics::{set_gauge, GaugeVec, MetricsRegistry, OneHot};
use nimbus_openstack::{unix_seconds, ApiResult, CloudApi, FloatingIp};

use super::Domain;

pub const FLOATING_IP_STATES: &[&str] = &["ACTIVE", "DOWN", "ERROR"];

const FLOATING_IP_STATUS: OneHot = OneHot::new(FLOATING_IP_STATES);

pub struct FloatingIpDomain;

#[async_trait]
impl Domain for FloatingIpDomain {
    type Entity = FloatingIp;
    type Context = ();

    fn name(&self) -> &'static str {
        "floating ip"
    }

    fn resource(&self) -> &'static str {
        "floating_ip"
    }

    fn families<'r>(&self, registry: &'r MetricsRegistry) -> Vec<&'r GaugeVec> {
        registry.floating_ip.resettable()
    }

    async fn list(&self, api: &dyn CloudApi) -> ApiResult<Vec<FloatingIp>> {
        api.list_floating_ips().await
    }

    async fn publish(
        &self,
        fip: &FloatingIp,
        _context: &(),
        _api: &dyn CloudApi,
        registry: &MetricsRegistry,
    ) {
        let families = &registry.floating_ip;
        let labels = [
            fip.id.as_str(),
            fip.floating_ip_address.as_str(),
            fip.fixed_ip_address.as_str(),
            fip.port_id.as_str(),
        ];

        set_gauge(&families.created_at, &labels, unix_seconds(fip.created_at));
        set_gauge(&families.updated_at, &labels, unix_seconds(fip.updated_at));
        FLOATING_IP_STATUS.publish(&families.status, &labels, &fip.status);
    }
}
