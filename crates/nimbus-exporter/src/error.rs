//! Collection and cycle error types

use nimbus_openstack::ApiError;
use thiserror::Error;

/// Failure to build the PersistentVolume index
#[derive(Error, Debug)]
pub enum CorrelationError {
    /// The Kubernetes API call failed
    #[error("unable to list persistent volumes: {0}")]
    Kube(#[from] kube::Error),

    /// No usable Kubernetes client configuration
    #[error("unable to load kubernetes configuration: {0}")]
    Config(String),

    /// Inventory backend reported a failure
    #[error("volume inventory unavailable: {0}")]
    Unavailable(String),
}

/// Failure of one domain collector
#[derive(Error, Debug)]
pub enum CollectError {
    /// Probing the domain's Neutron extension failed with anything but 404
    #[error("unable to probe {domain} extension: {source}")]
    Probe {
        domain: &'static str,
        #[source]
        source: ApiError,
    },

    /// Listing the domain's entities failed
    #[error("unable to list {domain}: {source}")]
    List {
        domain: &'static str,
        #[source]
        source: ApiError,
    },

    /// Fetching the domain's quota summary failed
    #[error("unable to get {domain} quotas: {source}")]
    Quota {
        domain: &'static str,
        #[source]
        source: ApiError,
    },

    /// The PersistentVolume index could not be built
    #[error("unable to correlate volumes: {0}")]
    Correlation(#[from] CorrelationError),
}

impl CollectError {
    /// Domain the failure belongs to
    pub fn domain(&self) -> &'static str {
        match self {
            CollectError::Probe { domain, .. }
            | CollectError::List { domain, .. }
            | CollectError::Quota { domain, .. } => domain,
            CollectError::Correlation(_) => "storage",
        }
    }
}

/// Why a session of scrape cycles ended
#[derive(Error, Debug)]
pub enum CycleError {
    /// Keystone rejected the credentials or was unreachable
    #[error("unable to authenticate to OpenStack: {0}")]
    Authentication(#[from] ApiError),

    /// Credentials or the Kubernetes client could not be set up
    #[error("unable to construct clients: {0:#}")]
    ClientConstruction(anyhow::Error),

    /// At least one domain collector failed during the cycle
    #[error("{} domain collector(s) failed", .0.len())]
    Domains(Vec<CollectError>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_of_error() {
        let err = CollectError::Quota {
            domain: "compute",
            source: ApiError::not_found("quota"),
        };
        assert_eq!(err.domain(), "compute");

        let err = CollectError::from(CorrelationError::Unavailable("down".to_string()));
        assert_eq!(err.domain(), "storage");
    }

    #[test]
    fn test_extension_error_display() {
        let err = CollectError::Probe {
            domain: "firewall v2",
            source: ApiError::Status {
                status: 500,
                url: "http://neutron/v2.0/extensions/fwaas_v2".to_string(),
            },
        };
        assert_eq!(err.domain(), "firewall v2");
        assert!(err.to_string().starts_with("unable to probe firewall v2 extension"));
    }

    #[test]
    fn test_cycle_error_display() {
        let err = CycleError::Domains(vec![
            CollectError::List {
                domain: "floating ip",
                source: ApiError::Status {
                    status: 503,
                    url: "http://neutron".to_string(),
                },
            },
            CorrelationError::Unavailable("down".to_string()).into(),
        ]);
        assert_eq!(err.to_string(), "2 domain collector(s) failed");
    }
}
