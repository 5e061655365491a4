use crate::auth::{self, Token};
use crate::error::{ApiError, ApiResult};
use crate::types::*;
use crate::CloudApi;
use async_trait::async_trait;
use chrono::Utc;
use nimbus_config::OpenStackCredentials;
use reqwest::StatusCode;
use serde::de::{DeserializeOwned, Error as _};
use serde_json::Value;
use std::fmt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Service endpoints resolved from the token catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub block_storage: String,
    pub network: String,
    pub compute: String,
    /// Octavia when available, otherwise the Neutron endpoint serving LBaaS v2
    pub load_balancer: String,
}

impl Endpoints {
    fn from_token(token: &Token, region: &str) -> ApiResult<Self> {
        let network = token.endpoint(&["network"], region)?;
        let load_balancer = match token.endpoint(&["load-balancer"], region) {
            Ok(url) => url,
            Err(_) => {
                info!("no load-balancer endpoint in catalog, using neutron for LBaaS");
                network.clone()
            }
        };

        Ok(Endpoints {
            block_storage: token.endpoint(&["volumev3", "block-storage", "volumev2"], region)?,
            compute: token.endpoint(&["compute"], region)?,
            network,
            load_balancer,
        })
    }
}

/// HTTP client for the OpenStack APIs, authenticated through Keystone v3
pub struct OpenStackClient {
    http: reqwest::Client,
    creds: OpenStackCredentials,
    token: RwLock<Token>,
    tenant_id: String,
    endpoints: Endpoints,
}

impl OpenStackClient {
    /// Authenticate and resolve every service endpoint
    pub async fn connect(creds: OpenStackCredentials) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nimbus-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::connect_with(http, creds).await
    }

    /// Same as [`connect`](Self::connect) with a caller-provided HTTP client
    pub async fn connect_with(
        http: reqwest::Client,
        creds: OpenStackCredentials,
    ) -> ApiResult<Self> {
        let token = auth::authenticate(&http, &creds).await?;
        let endpoints = Endpoints::from_token(&token, &creds.region)?;
        let tenant_id = if creds.tenant_id.is_empty() {
            token.project_id.clone()
        } else {
            creds.tenant_id.clone()
        };

        info!(
            username = %creds.username,
            tenant_id = %tenant_id,
            tenant_name = %creds.tenant_name,
            "OpenStack authentication was successful"
        );

        Ok(OpenStackClient {
            http,
            creds,
            token: RwLock::new(token),
            tenant_id,
            endpoints,
        })
    }

    /// Resolved service endpoints
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn current_token(&self) -> ApiResult<String> {
        {
            let token = self.token.read().await;
            if !token.needs_refresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }
        debug!("token close to expiry, renewing");
        self.reauthenticate().await
    }

    async fn reauthenticate(&self) -> ApiResult<String> {
        let fresh = auth::authenticate(&self.http, &self.creds).await?;
        let value = fresh.value.clone();
        *self.token.write().await = fresh;
        Ok(value)
    }

    /// GET a JSON document, re-authenticating once on 401
    async fn get_json(&self, url: &str) -> ApiResult<Value> {
        let token = self.current_token().await?;
        match self.send_get(url, &token).await {
            Err(err) if err.is_unauthorized() => {
                warn!(url, "token rejected, re-authenticating");
                let token = self.reauthenticate().await?;
                self.send_get(url, &token).await
            }
            other => other,
        }
    }

    async fn send_get(&self, url: &str, token: &str) -> ApiResult<Value> {
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .header("X-Auth-Token", token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(url));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::decode(url, e))
    }

    /// GET a single object wrapped under `key`
    async fn get_entity<T: DeserializeOwned>(&self, url: &str, key: &str) -> ApiResult<T> {
        let mut body = self.get_json(url).await?;
        take_field(&mut body, key, url)
    }

    /// GET every page of a collection, following `<key>_links` rel=next
    async fn list_all<T: DeserializeOwned>(&self, first_url: String, key: &str) -> ApiResult<Vec<T>> {
        let links_key = format!("{}_links", key);
        let mut items = Vec::new();
        let mut next = Some(first_url);

        while let Some(url) = next.take() {
            let mut page = self.get_json(&url).await?;
            let mut batch: Vec<T> = take_field(&mut page, key, &url)?;
            items.append(&mut batch);
            next = next_link(&page, &links_key).filter(|link| *link != url);
        }

        Ok(items)
    }
}

fn take_field<T: DeserializeOwned>(body: &mut Value, key: &str, url: &str) -> ApiResult<T> {
    let field = body
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| {
            ApiError::decode(url, serde_json::Error::custom(format!("missing field `{}`", key)))
        })?;
    serde_json::from_value(field).map_err(|e| ApiError::decode(url, e))
}

/// `href` of the rel=next entry in a `*_links` array
pub fn next_link(page: &Value, links_key: &str) -> Option<String> {
    page.get(links_key)?
        .as_array()?
        .iter()
        .find(|link| link.get("rel").and_then(Value::as_str) == Some("next"))
        .and_then(|link| link.get("href"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl fmt::Debug for OpenStackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenStackClient")
            .field("tenant_id", &self.tenant_id)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

#[async_trait]
impl CloudApi for OpenStackClient {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    async fn list_volumes(&self) -> ApiResult<Vec<Volume>> {
        let url = format!("{}/volumes/detail", self.endpoints.block_storage);
        self.list_all(url, "volumes").await
    }

    async fn volume_quota_usage(&self) -> ApiResult<VolumeQuotaUsage> {
        let url = format!(
            "{}/os-quota-sets/{}?usage=true",
            self.endpoints.block_storage,
            self.tenant_id()
        );
        self.get_entity(&url, "quota_set").await
    }

    async fn list_floating_ips(&self) -> ApiResult<Vec<FloatingIp>> {
        let url = format!("{}/v2.0/floatingips", self.endpoints.network);
        self.list_all(url, "floatingips").await
    }

    async fn list_load_balancers(&self) -> ApiResult<Vec<LoadBalancer>> {
        let url = format!("{}/v2.0/lbaas/loadbalancers", self.endpoints.load_balancer);
        self.list_all(url, "loadbalancers").await
    }

    async fn get_pool(&self, pool_id: &str) -> ApiResult<Pool> {
        let url = format!("{}/v2.0/lbaas/pools/{}", self.endpoints.load_balancer, pool_id);
        self.get_entity(&url, "pool").await
    }

    async fn get_pool_member(&self, pool_id: &str, member_id: &str) -> ApiResult<PoolMember> {
        let url = format!(
            "{}/v2.0/lbaas/pools/{}/members/{}",
            self.endpoints.load_balancer, pool_id, member_id
        );
        self.get_entity(&url, "member").await
    }

    async fn list_servers(&self) -> ApiResult<Vec<Server>> {
        let url = format!("{}/servers/detail", self.endpoints.compute);
        self.list_all(url, "servers").await
    }

    async fn compute_quota_detail(&self) -> ApiResult<ComputeQuotaDetail> {
        let url = format!(
            "{}/os-quota-sets/{}/detail",
            self.endpoints.compute,
            self.tenant_id()
        );
        self.get_entity(&url, "quota_set").await
    }

    async fn network_extension(&self, alias: &str) -> ApiResult<Capability> {
        let url = format!("{}/v2.0/extensions/{}", self.endpoints.network, alias);
        match self.get_json(&url).await {
            Ok(_) => Ok(Capability::Present),
            Err(err) if err.is_not_found() => Ok(Capability::Absent),
            Err(err) => Err(err),
        }
    }

    async fn list_firewalls_v1(&self) -> ApiResult<Vec<FirewallV1>> {
        let url = format!("{}/v2.0/fw/firewalls", self.endpoints.network);
        self.list_all(url, "firewalls").await
    }

    async fn list_firewall_groups_v2(&self) -> ApiResult<Vec<FirewallGroupV2>> {
        let url = format!("{}/v2.0/fwaas/firewall_groups", self.endpoints.network);
        self.list_all(url, "firewall_groups").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_next_link() {
        let page = json!({
            "volumes": [],
            "volumes_links": [
                {"rel": "previous", "href": "http://cinder/volumes/detail?marker=a"},
                {"rel": "next", "href": "http://cinder/volumes/detail?marker=b"}
            ]
        });
        assert_eq!(
            next_link(&page, "volumes_links").as_deref(),
            Some("http://cinder/volumes/detail?marker=b")
        );
        assert_eq!(next_link(&page, "servers_links"), None);
        assert_eq!(next_link(&json!({"volumes_links": []}), "volumes_links"), None);
    }

    #[test]
    fn test_take_field_missing() {
        let mut body = json!({"other": []});
        let result: ApiResult<Vec<Volume>> = take_field(&mut body, "volumes", "http://cinder");
        assert!(matches!(result, Err(ApiError::Decode { .. })));
    }
}
