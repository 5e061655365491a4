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
//! Per-domain resource collectors
//!
//! Every domain runs the same pipeline through [`ResourceCollector`]:
//!
//! 1. probe the domain's capability; an absent extension clears the domain
//! 2. prepare per-cycle context (the PV index for storage)
//! 3. list every entity, draining pagination, through request instrumentation
//! 4. reset the domain's families
//! 5. publish each entity
//! 6. publish the quota summary, for domains that have one
//!
//! A failure before step 4 still clears the domain, so a failed domain is
//! exposed empty rather than stale.

mod compute;
mod firewall;
mod floating_ip;
mod load_balancer;
mod storage;

pub use compute::{ComputeDomain, SERVER_STATES};
pub use firewall::{FirewallV1Domain, FirewallV2Domain, FIREWALL_V1_STATES, FIREWALL_V2_STATES};
pub use floating_ip::{FloatingIpDomain, FLOATING_IP_STATES};
pub use load_balancer::{LoadBalancerDomain, LB_PROVISIONING_STATES, POOL_PROVISIONING_STATES};
pub use storage::{StorageDomain, VOLUME_STATES};

use async_trait::async_trait;
use nimbus_metrics::{GaugeVec, MetricsRegistry, RequestMetrics};
use nimbus_openstack::{ApiResult, Capability, CloudApi};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::correlator::VolumeInventory;
use crate::error::CollectError;

/// Quota-type label values, in publication order
pub const QUOTA_IN_USE: &str = "in-use";
pub const QUOTA_RESERVED: &str = "reserved";
pub const QUOTA_LIMIT: &str = "limit";
pub const QUOTA_ALLOCATED: &str = "allocated";

/// One category of OpenStack resource
#[async_trait]
pub trait Domain: Send + Sync {
    /// Entity listed for this domain
    type Entity: Send + Sync;

    /// Per-cycle data shared by every entity's publication
    type Context: Default + Send + Sync;

    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Resource part of the `request` label of the list call
    fn resource(&self) -> &'static str;

    /// Families cleared before the domain is repopulated
    fn families<'r>(&self, registry: &'r MetricsRegistry) -> Vec<&'r GaugeVec>;

    /// Whether the backing service offers this domain at all
    async fn capability(&self, _api: &dyn CloudApi, _requests: &RequestMetrics) -> ApiResult<Capability> {
        Ok(Capability::Present)
    }

    async fn prepare(&self) -> Result<Self::Context, CollectError> {
        Ok(Self::Context::default())
    }

    /// Every entity of the domain, all pages drained
    async fn list(&self, api: &dyn CloudApi) -> ApiResult<Vec<Self::Entity>>;

    /// Write every series of one entity
    async fn publish(
        &self,
        entity: &Self::Entity,
        context: &Self::Context,
        api: &dyn CloudApi,
        registry: &MetricsRegistry,
    );

    /// Publish the domain's quota summary
    async fn publish_summary(&self, _api: &dyn CloudApi, _registry: &MetricsRegistry) -> ApiResult<()> {
        Ok(())
    }
}

/// A unit of work in a scrape cycle
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Refresh this collector's families in `registry`
    async fn collect(&self, api: &dyn CloudApi, registry: &MetricsRegistry) -> Result<(), CollectError>;
}

/// Generic collector driving one [`Domain`]
pub struct ResourceCollector<D> {
    domain: D,
}

impl<D: Domain> ResourceCollector<D> {
    pub fn new(domain: D) -> Self {
        ResourceCollector { domain }
    }

    fn clear(&self, registry: &MetricsRegistry) {
        registry.reset(&self.domain.families(registry));
    }
}

#[async_trait]
impl<D: Domain> Collector for ResourceCollector<D> {
    fn name(&self) -> &'static str {
        self.domain.name()
    }

    async fn collect(&self, api: &dyn CloudApi, registry: &MetricsRegistry) -> Result<(), CollectError> {
        let domain = self.domain.name();

        match self.domain.capability(api, &registry.requests).await {
            Ok(Capability::Present) => {}
            Ok(Capability::Absent) => {
                self.clear(registry);
                info!(domain, "skipping {} metrics as the extension is not enabled", domain);
                return Ok(());
            }
            Err(source) => {
                warn!(domain, error = %source, "Unable to probe {} extension", domain);
                self.clear(registry);
                return Err(CollectError::Probe { domain, source });
            }
        }

        let context = match self.domain.prepare().await {
            Ok(context) => context,
            Err(e) => {
                warn!(domain, error = %e, "Unable to prepare {} collection", domain);
                self.clear(registry);
                return Err(e);
            }
        };

        let listed = registry
            .requests
            .observe(self.domain.resource(), "list", self.domain.list(api))
            .await;
        let entities = match listed {
            Ok(entities) => entities,
            Err(source) => {
                // only warn, maybe the next cycle will work
                warn!(domain, error = %source, "Unable to list {}", domain);
                self.clear(registry);
                return Err(CollectError::List { domain, source });
            }
        };

        self.clear(registry);
        if entities.is_empty() {
            info!(domain, "No {} found", domain);
        }
        for entity in &entities {
            self.domain.publish(entity, &context, api, registry).await;
        }
        debug!(domain, count = entities.len(), "Published {} metrics", domain);

        self.domain
            .publish_summary(api, registry)
            .await
            .map_err(|source| {
                warn!(domain, error = %source, "Unable to get {} quotas", domain);
                CollectError::Quota { domain, source }
            })
    }
}

/// Every collector, in cycle order
pub fn default_collectors(inventory: Arc<dyn VolumeInventory>) -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(ResourceCollector::new(StorageDomain::new(inventory))),
        Box::new(ResourceCollector::new(FloatingIpDomain)),
        Box::new(ResourceCollector::new(LoadBalancerDomain)),
        Box::new(ResourceCollector::new(ComputeDomain)),
        Box::new(ResourceCollector::new(FirewallV1Domain)),
        Box::new(ResourceCollector::new(FirewallV2Domain)),
    ]
}

/// Probe a Neutron extension through request instrumentation
pub(crate) async fn probe_extension(
    api: &dyn CloudApi,
    requests: &RequestMetrics,
    alias: &str,
) -> ApiResult<Capability> {
    requests
        .observe("network_extension", "get", api.network_extension(alias))
        .await
}
