//! Keystone v3 password authentication and service catalog lookup

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Duration, Utc};
use nimbus_config::OpenStackCredentials;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Tokens closer than this to expiry are renewed before use
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// An issued Keystone token
#[derive(Debug, Clone)]
pub struct Token {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub project_id: String,
    pub catalog: Vec<CatalogEntry>,
}

impl Token {
    /// True when the token expires within the refresh margin of `now`
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - now <= Duration::seconds(TOKEN_REFRESH_MARGIN_SECS),
            None => false,
        }
    }

    /// Public endpoint URL for the first service type found in the region
    pub fn endpoint(&self, service_types: &[&str], region: &str) -> ApiResult<String> {
        for service_type in service_types {
            let found = self
                .catalog
                .iter()
                .filter(|entry| entry.service_type == *service_type)
                .flat_map(|entry| entry.endpoints.iter())
                .find(|ep| ep.interface == "public" && ep.in_region(region));
            if let Some(ep) = found {
                debug!(service = %service_type, url = %ep.url, "resolved endpoint");
                return Ok(ep.url.trim_end_matches('/').to_string());
            }
        }
        Err(ApiError::MissingEndpoint(service_types.join("|")))
    }
}

/// Service entry of the token catalog
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Endpoint of a catalog service
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

impl Endpoint {
    fn in_region(&self, region: &str) -> bool {
        self.region_id.as_deref() == Some(region) || self.region.as_deref() == Some(region)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    project: Option<ProjectRef>,
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: String,
}

/// URL of the token endpoint for the configured identity URL
pub fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{}/auth/tokens", base)
    } else {
        format!("{}/v3/auth/tokens", base)
    }
}

fn domain(creds: &OpenStackCredentials) -> Value {
    if !creds.domain_id.is_empty() {
        json!({ "id": creds.domain_id })
    } else if !creds.domain_name.is_empty() {
        json!({ "name": creds.domain_name })
    } else {
        json!({ "id": "default" })
    }
}

/// Build the password authentication request body
pub fn password_auth_body(creds: &OpenStackCredentials) -> Value {
    let user = if creds.user_id.is_empty() {
        json!({
            "name": creds.username,
            "password": creds.password,
            "domain": domain(creds),
        })
    } else {
        json!({
            "id": creds.user_id,
            "password": creds.password,
        })
    };

    let mut auth = json!({
        "identity": {
            "methods": ["password"],
            "password": { "user": user },
        }
    });

    let project = if !creds.tenant_id.is_empty() {
        Some(json!({ "id": creds.tenant_id }))
    } else if !creds.tenant_name.is_empty() {
        Some(json!({ "name": creds.tenant_name, "domain": domain(creds) }))
    } else {
        None
    };
    if let Some(project) = project {
        auth["scope"] = json!({ "project": project });
    }

    json!({ "auth": auth })
}

/// Request a new token from Keystone
pub async fn authenticate(
    http: &reqwest::Client,
    creds: &OpenStackCredentials,
) -> ApiResult<Token> {
    let url = tokens_url(&creds.auth_url);
    debug!("POST {}", url);

    let response = http
        .post(&url)
        .json(&password_auth_body(creds))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::auth(format!(
            "POST {} returned status {}",
            url, status
        )));
    }

    let value = response
        .headers()
        .get("X-Subject-Token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ApiError::auth("response carried no X-Subject-Token header"))?;

    let body = response.bytes().await?;
    let parsed: TokenResponse =
        serde_json::from_slice(&body).map_err(|e| ApiError::decode(url.as_str(), e))?;

    Ok(Token {
        value,
        expires_at: parsed
            .token
            .expires_at
            .as_deref()
            .and_then(crate::types::parse_timestamp),
        project_id: parsed.token.project.map(|p| p.id).unwrap_or_default(),
        catalog: parsed.token.catalog,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn creds() -> OpenStackCredentials {
        OpenStackCredentials {
            auth_url: "https://keystone.example.com:5000/v3".to_string(),
            username: "exporter".to_string(),
            password: "pw".to_string(),
            tenant_name: "platform".to_string(),
            domain_name: "Default".to_string(),
            region: "nova".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_tokens_url() {
        assert_eq!(
            tokens_url("https://k:5000/v3/"),
            "https://k:5000/v3/auth/tokens"
        );
        assert_eq!(tokens_url("https://k:5000"), "https://k:5000/v3/auth/tokens");
    }

    #[test]
    fn test_body_with_username_and_project_name() {
        let body = password_auth_body(&creds());
        let user = &body["auth"]["identity"]["password"]["user"];
        assert_eq!(user["name"], "exporter");
        assert_eq!(user["domain"]["name"], "Default");
        assert_eq!(body["auth"]["scope"]["project"]["name"], "platform");
    }

    #[test]
    fn test_body_with_user_id_and_project_id() {
        let creds = OpenStackCredentials {
            user_id: "u-1".to_string(),
            tenant_id: "p-1".to_string(),
            ..creds()
        };
        let body = password_auth_body(&creds);
        assert_eq!(body["auth"]["identity"]["password"]["user"]["id"], "u-1");
        assert_eq!(body["auth"]["scope"]["project"]["id"], "p-1");
    }

    #[test]
    fn test_endpoint_lookup() {
        let catalog: Vec<CatalogEntry> = serde_json::from_value(json!([
            {"type": "network", "endpoints": [
                {"interface": "internal", "region_id": "nova", "url": "http://internal:9696"},
                {"interface": "public", "region_id": "other", "url": "http://other:9696"},
                {"interface": "public", "region_id": "nova", "url": "http://public:9696/"}
            ]},
            {"type": "block-storage", "endpoints": [
                {"interface": "public", "region": "nova", "url": "http://cinder/v3/p-1"}
            ]}
        ]))
        .unwrap();
        let token = Token {
            value: "t".to_string(),
            expires_at: None,
            project_id: "p-1".to_string(),
            catalog,
        };

        assert_eq!(token.endpoint(&["network"], "nova").unwrap(), "http://public:9696");
        assert_eq!(
            token
                .endpoint(&["volumev3", "block-storage", "volumev2"], "nova")
                .unwrap(),
            "http://cinder/v3/p-1"
        );
        assert!(matches!(
            token.endpoint(&["load-balancer"], "nova"),
            Err(ApiError::MissingEndpoint(_))
        ));
    }

    #[test]
    fn test_needs_refresh() {
        let now = Utc::now();
        let mut token = Token {
            value: "t".to_string(),
            expires_at: Some(now + Duration::seconds(30)),
            project_id: String::new(),
            catalog: Vec::new(),
        };
        assert!(token.needs_refresh(now));
        token.expires_at = Some(now + Duration::hours(1));
        assert!(!token.needs_refresh(now));
        token.expires_at = None;
        assert!(!token.needs_refresh(now));
    }
}
