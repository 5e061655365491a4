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

//! OpenStack API access for the nimbus exporter
//!
//! The [`CloudApi`] trait is the narrow read-only surface the collectors need:
//! block storage volumes and quotas, floating IPs, load balancers with their
//! pools and members, compute servers and quotas, and the two FWaaS generations.
//!
//! Two implementations ship with the crate:
//! - [`OpenStackClient`]: Keystone v3 password auth over `reqwest`, endpoints
//!   from the token catalog, pagination drained through `*_links`
//! - [`mock::MockCloud`]: in-memory cloud for tests
//!
//! # Examples
//!
//! ```no_run
//! use nimbus_config::OpenStackCredentials;
//! use nimbus_openstack::{CloudApi, OpenStackClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let creds = OpenStackCredentials::from_env()?;
//!     let client = OpenStackClient::connect(creds).await?;
//!
//!     for volume in client.list_volumes().await? {
//!         println!("{} {}", volume.id, volume.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod mock;
pub mod types;

use async_trait::async_trait;
use std::fmt::Debug;

pub use client::{Endpoints, OpenStackClient};
pub use error::{ApiError, ApiResult};
pub use types::*;

/// Read-only OpenStack operations used by the exporter
///
/// List operations return every page. Single GETs return
/// [`ApiError::NotFound`] for missing objects.
#[async_trait]
pub trait CloudApi: Send + Sync + Debug {
    /// Project the token is scoped to
    fn tenant_id(&self) -> &str;

    /// All Cinder volumes visible to the project
    async fn list_volumes(&self) -> ApiResult<Vec<Volume>>;

    /// Cinder quota usage for volumes and gigabytes
    async fn volume_quota_usage(&self) -> ApiResult<VolumeQuotaUsage>;

    /// All Neutron floating IPs
    async fn list_floating_ips(&self) -> ApiResult<Vec<FloatingIp>>;

    /// All load balancers, each carrying only its pool ids
    async fn list_load_balancers(&self) -> ApiResult<Vec<LoadBalancer>>;

    /// Pool details including member ids
    async fn get_pool(&self, pool_id: &str) -> ApiResult<Pool>;

    /// Member details
    async fn get_pool_member(&self, pool_id: &str, member_id: &str) -> ApiResult<PoolMember>;

    /// All Nova servers with their attached volume ids
    async fn list_servers(&self) -> ApiResult<Vec<Server>>;

    /// Nova quota details
    async fn compute_quota_detail(&self) -> ApiResult<ComputeQuotaDetail>;

    /// Whether a Neutron extension alias (`fwaas`, `fwaas_v2`) is enabled
    async fn network_extension(&self, alias: &str) -> ApiResult<Capability>;

    /// All FWaaS v1 firewalls
    async fn list_firewalls_v1(&self) -> ApiResult<Vec<FirewallV1>>;

    /// All FWaaS v2 firewall groups
    async fn list_firewall_groups_v2(&self) -> ApiResult<Vec<FirewallGroupV2>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _check_object_safe(_: &dyn CloudApi) {}
    }
}
