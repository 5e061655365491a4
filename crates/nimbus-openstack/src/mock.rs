//! In-memory mock cloud for testing
//!
//! Holds every entity kind behind an `Arc<RwLock<_>>` so a test can change
//! the cloud between two scrape cycles, and lets individual operations be
//! switched to failing.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nimbus_openstack::{mock::MockCloud, CloudApi, Volume};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cloud = MockCloud::new();
//!     cloud
//!         .set_volumes(vec![Volume {
//!             id: "vol-1".to_string(),
//!             status: "available".to_string(),
//!             ..Default::default()
//!         }])
//!         .await;
//!
//!     assert_eq!(cloud.list_volumes().await?.len(), 1);
//!
//!     cloud.fail("list_volumes").await;
//!     assert!(cloud.list_volumes().await.is_err());
//!     Ok(())
//! }
//! ```

use crate::error::{ApiError, ApiResult};
use crate::types::*;
use crate::CloudApi;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct CloudState {
    volumes: Vec<Volume>,
    volume_quota: VolumeQuotaUsage,
    floating_ips: Vec<FloatingIp>,
    load_balancers: Vec<LoadBalancer>,
    pools: HashMap<String, Pool>,
    members: HashMap<(String, String), PoolMember>,
    servers: Vec<Server>,
    compute_quota: ComputeQuotaDetail,
    extensions: HashSet<String>,
    firewalls_v1: Vec<FirewallV1>,
    firewall_groups_v2: Vec<FirewallGroupV2>,
    failing: HashSet<String>,
}

/// In-memory [`CloudApi`] implementation
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct MockCloud {
    tenant_id: String,
    state: Arc<RwLock<CloudState>>,
}

impl MockCloud {
    /// Create an empty cloud with no extensions enabled
    pub fn new() -> Self {
        Self::with_tenant("mock-tenant")
    }

    /// Create an empty cloud scoped to `tenant_id`
    pub fn with_tenant(tenant_id: impl Into<String>) -> Self {
        MockCloud {
            tenant_id: tenant_id.into(),
            state: Arc::new(RwLock::new(CloudState::default())),
        }
    }

    pub async fn set_volumes(&self, volumes: Vec<Volume>) {
        self.state.write().await.volumes = volumes;
    }

    pub async fn set_volume_quota(&self, quota: VolumeQuotaUsage) {
        self.state.write().await.volume_quota = quota;
    }

    pub async fn set_floating_ips(&self, floating_ips: Vec<FloatingIp>) {
        self.state.write().await.floating_ips = floating_ips;
    }

    pub async fn set_load_balancers(&self, load_balancers: Vec<LoadBalancer>) {
        self.state.write().await.load_balancers = load_balancers;
    }

    /// Register a pool returned by [`CloudApi::get_pool`]
    pub async fn add_pool(&self, pool: Pool) {
        self.state.write().await.pools.insert(pool.id.clone(), pool);
    }

    /// Register a member returned by [`CloudApi::get_pool_member`]
    pub async fn add_pool_member(&self, pool_id: impl Into<String>, member: PoolMember) {
        self.state
            .write()
            .await
            .members
            .insert((pool_id.into(), member.id.clone()), member);
    }

    pub async fn set_servers(&self, servers: Vec<Server>) {
        self.state.write().await.servers = servers;
    }

    pub async fn set_compute_quota(&self, quota: ComputeQuotaDetail) {
        self.state.write().await.compute_quota = quota;
    }

    /// Enable a Neutron extension alias
    pub async fn enable_extension(&self, alias: impl Into<String>) {
        self.state.write().await.extensions.insert(alias.into());
    }

    /// Disable a Neutron extension alias
    pub async fn disable_extension(&self, alias: &str) {
        self.state.write().await.extensions.remove(alias);
    }

    pub async fn set_firewalls_v1(&self, firewalls: Vec<FirewallV1>) {
        self.state.write().await.firewalls_v1 = firewalls;
    }

    pub async fn set_firewall_groups_v2(&self, groups: Vec<FirewallGroupV2>) {
        self.state.write().await.firewall_groups_v2 = groups;
    }

    /// Make the named trait operation (e.g. `list_volumes`) return an error
    pub async fn fail(&self, operation: impl Into<String>) {
        self.state.write().await.failing.insert(operation.into());
    }

    /// Make every operation succeed again
    pub async fn clear_failures(&self) {
        self.state.write().await.failing.clear();
    }

    async fn check(&self, operation: &str) -> ApiResult<()> {
        if self.state.read().await.failing.contains(operation) {
            return Err(ApiError::Status {
                status: 503,
                url: format!("mock://{}", operation),
            });
        }
        Ok(())
    }
}

impl Default for MockCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockCloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockCloud")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

#[async_trait]
impl CloudApi for MockCloud {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    async fn list_volumes(&self) -> ApiResult<Vec<Volume>> {
        self.check("list_volumes").await?;
        Ok(self.state.read().await.volumes.clone())
    }

    async fn volume_quota_usage(&self) -> ApiResult<VolumeQuotaUsage> {
        self.check("volume_quota_usage").await?;
        Ok(self.state.read().await.volume_quota.clone())
    }

    async fn list_floating_ips(&self) -> ApiResult<Vec<FloatingIp>> {
        self.check("list_floating_ips").await?;
        Ok(self.state.read().await.floating_ips.clone())
    }

    async fn list_load_balancers(&self) -> ApiResult<Vec<LoadBalancer>> {
        self.check("list_load_balancers").await?;
        Ok(self.state.read().await.load_balancers.clone())
    }

    async fn get_pool(&self, pool_id: &str) -> ApiResult<Pool> {
        self.check("get_pool").await?;
        self.state
            .read()
            .await
            .pools
            .get(pool_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("pool {}", pool_id)))
    }

    async fn get_pool_member(&self, pool_id: &str, member_id: &str) -> ApiResult<PoolMember> {
        self.check("get_pool_member").await?;
        self.state
            .read()
            .await
            .members
            .get(&(pool_id.to_string(), member_id.to_string()))
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("member {} of pool {}", member_id, pool_id)))
    }

    async fn list_servers(&self) -> ApiResult<Vec<Server>> {
        self.check("list_servers").await?;
        Ok(self.state.read().await.servers.clone())
    }

    async fn compute_quota_detail(&self) -> ApiResult<ComputeQuotaDetail> {
        self.check("compute_quota_detail").await?;
        Ok(self.state.read().await.compute_quota.clone())
    }

    async fn network_extension(&self, alias: &str) -> ApiResult<Capability> {
        self.check("network_extension").await?;
        if self.state.read().await.extensions.contains(alias) {
            Ok(Capability::Present)
        } else {
            Ok(Capability::Absent)
        }
    }

    async fn list_firewalls_v1(&self) -> ApiResult<Vec<FirewallV1>> {
        self.check("list_firewalls_v1").await?;
        Ok(self.state.read().await.firewalls_v1.clone())
    }

    async fn list_firewall_groups_v2(&self) -> ApiResult<Vec<FirewallGroupV2>> {
        self.check("list_firewall_groups_v2").await?;
        Ok(self.state.read().await.firewall_groups_v2.clone())
    }
}
