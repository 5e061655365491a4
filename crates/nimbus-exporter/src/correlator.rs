//! Kubernetes PersistentVolume correlation for Cinder volumes
//!
//! Builds, once per cycle, an index from the backing Cinder volume id to the
//! PersistentVolume bound to it, so volume metrics can carry claim and storage
//! class labels.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolume;
use kube::{
    api::{Api, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::CorrelationError;

/// CSI driver name of the Cinder CSI plugin
pub const CINDER_CSI_DRIVER: &str = "cinder.csi.openstack.org";

/// Kubernetes attributes of the PV backing a volume
///
/// Every field is an empty string when the volume has no PV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PvMetadata {
    pub pvc_name: String,
    pub pvc_namespace: String,
    pub pv_name: String,
    pub storage_class: String,
    pub reclaim_policy: String,
    pub fs_type: String,
}

impl PvMetadata {
    fn from_pv(pv: &PersistentVolume, fs_type: Option<&str>) -> Self {
        let spec = pv.spec.as_ref();
        let claim = spec.and_then(|s| s.claim_ref.as_ref());

        PvMetadata {
            pvc_name: claim.and_then(|c| c.name.clone()).unwrap_or_default(),
            pvc_namespace: claim.and_then(|c| c.namespace.clone()).unwrap_or_default(),
            pv_name: pv.metadata.name.clone().unwrap_or_default(),
            storage_class: spec
                .and_then(|s| s.storage_class_name.clone())
                .unwrap_or_default(),
            reclaim_policy: spec
                .and_then(|s| s.persistent_volume_reclaim_policy.clone())
                .unwrap_or_default(),
            fs_type: fs_type.unwrap_or_default().to_string(),
        }
    }

    /// Label values in `pvc_name, pvc_namespace, pv_name, pv_storage_class,
    /// pv_reclaim_policy, pv_fs_type` order
    pub fn labels(&self) -> [&str; 6] {
        [
            &self.pvc_name,
            &self.pvc_namespace,
            &self.pv_name,
            &self.storage_class,
            &self.reclaim_policy,
            &self.fs_type,
        ]
    }
}

/// Source of the cluster's PersistentVolumes
#[async_trait]
pub trait VolumeInventory: Send + Sync + fmt::Debug {
    /// List every PersistentVolume of the cluster
    async fn persistent_volumes(&self) -> Result<Vec<PersistentVolume>, CorrelationError>;
}

/// Inventory backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeInventory {
    client: Client,
}

impl KubeInventory {
    /// Build a client from `kubeconfig`, or infer in-cluster/default config
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, CorrelationError> {
        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| CorrelationError::Config(e.to_string()))?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| CorrelationError::Config(e.to_string()))?
            }
            None => Config::infer()
                .await
                .map_err(|e| CorrelationError::Config(e.to_string()))?,
        };

        info!(cluster_url = %config.cluster_url, "Kubernetes client initialized");
        Ok(KubeInventory {
            client: Client::try_from(config)?,
        })
    }
}

impl fmt::Debug for KubeInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeInventory").finish_non_exhaustive()
    }
}

#[async_trait]
impl VolumeInventory for KubeInventory {
    async fn persistent_volumes(&self) -> Result<Vec<PersistentVolume>, CorrelationError> {
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

/// Fixed inventory, for tests and clusters without Kubernetes
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    volumes: Vec<PersistentVolume>,
    failure: Option<String>,
}

impl StaticInventory {
    pub fn new(volumes: Vec<PersistentVolume>) -> Self {
        StaticInventory {
            volumes,
            failure: None,
        }
    }

    /// An inventory whose every listing fails with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        StaticInventory {
            volumes: Vec::new(),
            failure: Some(reason.into()),
        }
    }
}

#[async_trait]
impl VolumeInventory for StaticInventory {
    async fn persistent_volumes(&self) -> Result<Vec<PersistentVolume>, CorrelationError> {
        match &self.failure {
            Some(reason) => Err(CorrelationError::Unavailable(reason.clone())),
            None => Ok(self.volumes.clone()),
        }
    }
}

/// PersistentVolume metadata keyed by backing Cinder volume id
#[derive(Debug, Clone, Default)]
pub struct PvIndex {
    by_volume: HashMap<String, PvMetadata>,
}

impl PvIndex {
    /// Index `volumes` by legacy Cinder volume id or Cinder CSI handle
    pub fn from_volumes(volumes: &[PersistentVolume]) -> Self {
        let mut by_volume = HashMap::new();

        for pv in volumes {
            let name = pv.metadata.name.as_deref().unwrap_or_default();
            let Some(spec) = pv.spec.as_ref() else {
                debug!(pv = name, "ignoring pv without spec");
                continue;
            };

            if let Some(cinder) = &spec.cinder {
                by_volume.insert(
                    cinder.volume_id.clone(),
                    PvMetadata::from_pv(pv, cinder.fs_type.as_deref()),
                );
            } else if let Some(csi) = &spec.csi {
                if csi.driver == CINDER_CSI_DRIVER {
                    by_volume.insert(
                        csi.volume_handle.clone(),
                        PvMetadata::from_pv(pv, csi.fs_type.as_deref()),
                    );
                } else {
                    debug!(pv = name, driver = %csi.driver, "ignoring pv: unimplemented csi driver");
                }
            } else {
                debug!(pv = name, "ignoring pv: unimplemented volume plugin");
            }
        }

        PvIndex { by_volume }
    }

    /// Metadata for `volume_id`, all empty when no PV is backed by it
    pub fn metadata(&self, volume_id: &str) -> PvMetadata {
        self.by_volume.get(volume_id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_volume.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_volume.is_empty()
    }
}

/// List the inventory once and index it
pub async fn build_index(inventory: &dyn VolumeInventory) -> Result<PvIndex, CorrelationError> {
    let volumes = inventory.persistent_volumes().await?;
    let index = PvIndex::from_volumes(&volumes);
    debug!(
        persistent_volumes = volumes.len(),
        cinder_backed = index.len(),
        "Built persistent volume index"
    );
    Ok(index)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use k8s_openapi::api::core::v1::{
        CSIPersistentVolumeSource, CinderPersistentVolumeSource, ObjectReference,
        PersistentVolume, PersistentVolumeSpec,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pv(name: &str, spec: PersistentVolumeSpec) -> PersistentVolume {
        PersistentVolume {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(spec),
            ..Default::default()
        }
    }

    fn claim(name: &str, namespace: &str) -> Option<ObjectReference> {
        Some(ObjectReference {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        })
    }

    pub fn csi_pv(name: &str, driver: &str, handle: &str, pvc: &str, namespace: &str) -> PersistentVolume {
        pv(
            name,
            PersistentVolumeSpec {
                csi: Some(CSIPersistentVolumeSource {
                    driver: driver.to_string(),
                    volume_handle: handle.to_string(),
                    fs_type: Some("ext4".to_string()),
                    ..Default::default()
                }),
                claim_ref: claim(pvc, namespace),
                storage_class_name: Some("cinder-ssd".to_string()),
                persistent_volume_reclaim_policy: Some("Delete".to_string()),
                ..Default::default()
            },
        )
    }

    pub fn legacy_pv(name: &str, volume_id: &str) -> PersistentVolume {
        pv(
            name,
            PersistentVolumeSpec {
                cinder: Some(CinderPersistentVolumeSource {
                    volume_id: volume_id.to_string(),
                    fs_type: Some("xfs".to_string()),
                    ..Default::default()
                }),
                persistent_volume_reclaim_policy: Some("Retain".to_string()),
                ..Default::default()
            },
        )
    }

    pub fn nfs_pv(name: &str) -> PersistentVolume {
        pv(name, PersistentVolumeSpec::default())
    }
}
