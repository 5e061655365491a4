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
//! Configuration management for the nimbus exporter
//!
//! Settings come from defaults, an optional TOML/YAML/JSON file and
//! `NIMBUS_*` environment variables. OpenStack credentials are resolved
//! separately from a cloud.conf `[Global]` section or `OS_*` variables.
//!
//! # Example
//!
//! ```no_run
//! use nimbus_config::{ConfigLoader, OpenStackCredentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load(None).await?;
//!     let creds = OpenStackCredentials::resolve(config.cloud_conf.as_deref())?;
//!
//!     println!("Scraping {} every {}s", creds.auth_url, config.refresh_interval_secs);
//!     Ok(())
//! }
//! ```

pub mod credentials;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use credentials::{OpenStackCredentials, DEFAULT_REGION};
pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_env_overrides, apply_overrides_from, ConfigFormat, ConfigLoader};
pub use schema::*;
pub use validation::Validator;
