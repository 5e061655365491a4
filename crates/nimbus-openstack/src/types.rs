//! Entities returned by the OpenStack APIs
//!
//! Each type mirrors the subset of the JSON body the exporter reads. Strings
//! that OpenStack may send as `null` deserialize to an empty string.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Whether an optional API extension is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Present,
    Absent,
}

/// Reference to a child object carrying only its id
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IdRef {
    pub id: String,
}

impl IdRef {
    pub fn new(id: impl Into<String>) -> Self {
        IdRef { id: id.into() }
    }
}

/// Cinder volume
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    pub status: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub availability_zone: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub volume_type: String,
    /// Size in GiB
    #[serde(default)]
    pub size: u64,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<VolumeAttachment>,
}

/// Server attachment of a Cinder volume
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VolumeAttachment {
    #[serde(default, deserialize_with = "nullable_string")]
    pub server_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub device: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub host_name: String,
    #[serde(default, deserialize_with = "timestamp")]
    pub attached_at: Option<DateTime<Utc>>,
}

/// One quota resource as reported by `os-quota-sets?usage=true`
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuotaUsage {
    pub in_use: i64,
    pub reserved: i64,
    pub limit: i64,
    pub allocated: i64,
}

/// Block storage quota usage for the tenant
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolumeQuotaUsage {
    pub volumes: QuotaUsage,
    pub gigabytes: QuotaUsage,
}

/// Neutron floating IP
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FloatingIp {
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub floating_ip_address: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub fixed_ip_address: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub port_id: String,
    pub status: String,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// LBaaS v2 / Octavia load balancer
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub vip_address: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub provider: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub vip_port_id: String,
    #[serde(default)]
    pub admin_state_up: bool,
    pub provisioning_status: String,
    #[serde(default)]
    pub pools: Vec<IdRef>,
}

/// Load balancer pool
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pool {
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    pub provisioning_status: String,
    #[serde(default)]
    pub members: Vec<IdRef>,
}

/// Load balancer pool member
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PoolMember {
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    pub provisioning_status: String,
}

/// Nova server
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    pub status: String,
    #[serde(rename = "os-extended-volumes:volumes_attached", default)]
    pub volumes_attached: Vec<IdRef>,
}

/// One quota resource as reported by `os-quota-sets/{tenant}/detail`
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuotaDetail {
    pub in_use: i64,
    pub reserved: i64,
    pub limit: i64,
}

/// Compute quota details for the tenant
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComputeQuotaDetail {
    pub cores: QuotaDetail,
    pub floating_ips: QuotaDetail,
    pub instances: QuotaDetail,
    pub ram: QuotaDetail,
    pub server_group_members: QuotaDetail,
}

/// FWaaS v1 firewall
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FirewallV1 {
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub firewall_policy_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub project_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub tenant_id: String,
    #[serde(default)]
    pub admin_state_up: bool,
    pub status: String,
}

impl FirewallV1 {
    /// Owning project, falling back to the legacy tenant field
    pub fn project(&self) -> &str {
        owner(&self.project_id, &self.tenant_id)
    }
}

/// FWaaS v2 firewall group
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FirewallGroupV2 {
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub ingress_firewall_policy_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub egress_firewall_policy_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub project_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub tenant_id: String,
    #[serde(default)]
    pub admin_state_up: bool,
    pub status: String,
}

impl FirewallGroupV2 {
    /// Owning project, falling back to the legacy tenant field
    pub fn project(&self) -> &str {
        owner(&self.project_id, &self.tenant_id)
    }
}

fn owner<'a>(project_id: &'a str, tenant_id: &'a str) -> &'a str {
    if project_id.is_empty() {
        tenant_id
    } else {
        project_id
    }
}

/// Seconds since the epoch, 0 when the timestamp is unknown
pub fn unix_seconds(ts: Option<DateTime<Utc>>) -> f64 {
    ts.map_or(0.0, |t| t.timestamp() as f64)
}

/// Parse an OpenStack timestamp
///
/// Accepts RFC 3339 and the zone-less `YYYY-MM-DDTHH:MM:SS[.ffffff]` form,
/// which is read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01T12:30:00.000000").map(|t| t.timestamp()),
            Some(expected.timestamp())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_unix_seconds_missing_is_zero() {
        assert_eq!(unix_seconds(None), 0.0);
        assert_eq!(unix_seconds(parse_timestamp("1970-01-01T00:01:00Z")), 60.0);
    }

    #[test]
    fn test_volume_with_nulls() {
        let volume: Volume = serde_json::from_value(json!({
            "id": "vol-1",
            "name": null,
            "description": null,
            "status": "in-use",
            "availability_zone": "nova",
            "volume_type": null,
            "size": 10,
            "created_at": "2024-01-02T03:04:05.000000",
            "updated_at": null,
            "attachments": [{
                "server_id": "srv-1",
                "device": "/dev/vdb",
                "host_name": null,
                "attached_at": "2024-01-02T03:05:00.000000"
            }]
        }))
        .unwrap();

        assert_eq!(volume.name, "");
        assert_eq!(volume.volume_type, "");
        assert!(volume.created_at.is_some());
        assert!(volume.updated_at.is_none());
        assert_eq!(volume.attachments[0].server_id, "srv-1");
        assert_eq!(volume.attachments[0].host_name, "");
    }

    #[test]
    fn test_server_attached_volumes() {
        let server: Server = serde_json::from_value(json!({
            "id": "srv-1",
            "name": "worker-0",
            "status": "ACTIVE",
            "os-extended-volumes:volumes_attached": [{"id": "vol-1"}, {"id": "vol-2"}]
        }))
        .unwrap();
        assert_eq!(server.volumes_attached.len(), 2);
    }

    #[test]
    fn test_firewall_project_fallback() {
        let fw: FirewallV1 = serde_json::from_value(json!({
            "id": "fw-1",
            "tenant_id": "t-1",
            "status": "ACTIVE",
            "admin_state_up": true
        }))
        .unwrap();
        assert_eq!(fw.project(), "t-1");
    }
}
