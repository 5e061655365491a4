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
//! OpenStack credential resolution
//!
//! Credentials come either from the `[Global]` section of a Kubernetes
//! cloud-provider `cloud.conf` or from the usual `OS_*` environment variables.

use crate::error::{ConfigError, ConfigResult};
use crate::validation::Validator;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "nova";

/// Password credentials for Keystone v3
#[derive(Clone, Default, PartialEq)]
pub struct OpenStackCredentials {
    pub auth_url: String,
    pub username: String,
    pub user_id: String,
    pub password: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub domain_id: String,
    pub domain_name: String,
    pub region: String,
}

// Keeps the password out of logs
impl fmt::Debug for OpenStackCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenStackCredentials")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("tenant_name", &self.tenant_name)
            .field("domain_id", &self.domain_id)
            .field("domain_name", &self.domain_name)
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CloudConf {
    #[serde(rename = "global", alias = "Global")]
    global: GlobalSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GlobalSection {
    #[serde(rename = "auth-url")]
    auth_url: String,
    username: String,
    #[serde(rename = "user-id")]
    user_id: String,
    password: String,
    #[serde(rename = "tenant-id")]
    tenant_id: String,
    #[serde(rename = "tenant-name")]
    tenant_name: String,
    #[serde(rename = "domain-id")]
    domain_id: String,
    #[serde(rename = "domain-name")]
    domain_name: String,
    region: String,
}

impl From<GlobalSection> for OpenStackCredentials {
    fn from(global: GlobalSection) -> Self {
        OpenStackCredentials {
            auth_url: global.auth_url,
            username: global.username,
            user_id: global.user_id,
            password: global.password,
            tenant_id: global.tenant_id,
            tenant_name: global.tenant_name,
            domain_id: global.domain_id,
            domain_name: global.domain_name,
            region: if global.region.is_empty() {
                DEFAULT_REGION.to_string()
            } else {
                global.region
            },
        }
    }
}

impl OpenStackCredentials {
    /// Resolve credentials from a cloud.conf when given, else from the environment
    pub fn resolve(cloud_conf: Option<&Path>) -> ConfigResult<Self> {
        match cloud_conf {
            Some(path) => {
                let creds = Self::from_cloud_conf(path)?;
                info!(path = %path.display(), "OpenStack credentials read from cloud.conf");
                Ok(creds)
            }
            None => {
                let creds = Self::from_env()?;
                info!("OpenStack credentials read from environment");
                Ok(creds)
            }
        }
    }

    /// Read the `[Global]` section of a cloud.conf file
    ///
    /// The INI reader treats `\` as an escape character, so a `[Global]`
    /// value containing a backslash is rejected rather than passed on with
    /// the backslash silently dropped. Such credentials must come from the
    /// `OS_*` environment variables.
    pub fn from_cloud_conf(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_cloud_conf_str(&content)
    }

    /// Parse cloud.conf content held in memory
    pub fn from_cloud_conf_str(content: &str) -> ConfigResult<Self> {
        reject_backslashes(content)?;
        let conf: CloudConf = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Ini))
            .build()?
            .try_deserialize()?;
        let creds = OpenStackCredentials::from(conf.global);
        creds.validate()?;
        Ok(creds)
    }

    /// Read credentials from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup
    ///
    /// Project variables take precedence over their legacy tenant spellings.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.is_empty())
                .unwrap_or_default()
        };

        let region = first(&["OS_REGION_NAME"]);
        let creds = OpenStackCredentials {
            auth_url: first(&["OS_AUTH_URL"]),
            username: first(&["OS_USERNAME"]),
            user_id: first(&["OS_USERID", "OS_USER_ID"]),
            password: first(&["OS_PASSWORD"]),
            tenant_id: first(&["OS_PROJECT_ID", "OS_TENANT_ID"]),
            tenant_name: first(&["OS_PROJECT_NAME", "OS_TENANT_NAME"]),
            domain_id: first(&["OS_DOMAIN_ID", "OS_USER_DOMAIN_ID"]),
            domain_name: first(&["OS_DOMAIN_NAME", "OS_USER_DOMAIN_NAME"]),
            region: if region.is_empty() {
                DEFAULT_REGION.to_string()
            } else {
                region
            },
        };
        creds.validate()?;
        Ok(creds)
    }
}

/// Fails on the first `[Global]` value holding a backslash
fn reject_backslashes(content: &str) -> ConfigResult<()> {
    let mut in_global = false;
    for line in content.lines().map(str::trim) {
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_global = section.trim().eq_ignore_ascii_case("global");
            continue;
        }
        if !in_global || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if value.contains('\\') {
                return Err(ConfigError::invalid_value(
                    format!("cloud.conf [Global] {}", key.trim()),
                    "backslashes are not supported in cloud.conf values, use the OS_* environment variables instead",
                ));
            }
        }
    }
    Ok(())
}
