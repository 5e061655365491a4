//! Cinder volumes, correlated with Kubernetes PersistentVolumes

use async_trait::async_trait;
use nimbus_metrics::registry::VOLUME_STATUS_POSITION;
use nimbus_metrics::{set_gauge, GaugeVec, MetricsRegistry, OneHot};
use nimbus_openstack::{unix_seconds, ApiResult, CloudApi, QuotaUsage, Volume};
use std::sync::Arc;

use super::{Domain, QUOTA_ALLOCATED, QUOTA_IN_USE, QUOTA_LIMIT, QUOTA_RESERVED};
use crate::correlator::{build_index, PvIndex, VolumeInventory};
use crate::error::CollectError;

/// Cinder volume states
pub const VOLUME_STATES: &[&str] = &[
    "creating",
    "available",
    "deleting",
    "error",
    "error-deleting",
    "error-managing",
    "managing",
    "attaching",
    "in-use",
    "detaching",
    "maintenance",
    "restoring-backup",
    "error-restoring",
    "reserved",
    "awaiting-transfer",
    "backing-up",
    "error-backing-up",
    "error-extending",
    "downloading",
    "uploading",
    "retyping",
    "extending",
];

const VOLUME_STATUS: OneHot = OneHot::new(VOLUME_STATES);

pub struct StorageDomain {
    inventory: Arc<dyn VolumeInventory>,
}

impl StorageDomain {
    pub fn new(inventory: Arc<dyn VolumeInventory>) -> Self {
        StorageDomain { inventory }
    }
}

fn publish_quota(family: &GaugeVec, usage: &QuotaUsage) {
    set_gauge(family, &[QUOTA_IN_USE], usage.in_use as f64);
    set_gauge(family, &[QUOTA_RESERVED], usage.reserved as f64);
    set_gauge(family, &[QUOTA_LIMIT], usage.limit as f64);
    set_gauge(family, &[QUOTA_ALLOCATED], usage.allocated as f64);
}

#[async_trait]
impl Domain for StorageDomain {
    type Entity = Volume;
    type Context = PvIndex;

    fn name(&self) -> &'static str {
        "storage"
    }

    fn resource(&self) -> &'static str {
        "volume"
    }

    fn families<'r>(&self, registry: &'r MetricsRegistry) -> Vec<&'r GaugeVec> {
        registry.storage.resettable()
    }

    async fn prepare(&self) -> Result<PvIndex, CollectError> {
        Ok(build_index(self.inventory.as_ref()).await?)
    }

    async fn list(&self, api: &dyn CloudApi) -> ApiResult<Vec<Volume>> {
        api.list_volumes().await
    }

    async fn publish(
        &self,
        volume: &Volume,
        index: &PvIndex,
        _api: &dyn CloudApi,
        registry: &MetricsRegistry,
    ) {
        let families = &registry.storage;
        let pv = index.metadata(&volume.id);
        let pv_labels = pv.labels();

        let mut labels = vec![
            volume.id.as_str(),
            volume.description.as_str(),
            volume.name.as_str(),
            volume.status.as_str(),
            volume.availability_zone.as_str(),
            volume.volume_type.as_str(),
        ];
        labels.extend_from_slice(&pv_labels);

        set_gauge(&families.created_at, &labels, unix_seconds(volume.created_at));
        set_gauge(&families.updated_at, &labels, unix_seconds(volume.updated_at));
        set_gauge(&families.size, &labels, volume.size as f64);

        if volume.attachments.is_empty() {
            let mut row = labels.clone();
            row.extend_from_slice(&["", "", ""]);
            set_gauge(&families.attached_at, &row, 0.0);
        }
        for attachment in &volume.attachments {
            let mut row = labels.clone();
            row.extend_from_slice(&[
                attachment.server_id.as_str(),
                attachment.device.as_str(),
                attachment.host_name.as_str(),
            ]);
            set_gauge(&families.attached_at, &row, unix_seconds(attachment.attached_at));
        }

        labels.remove(VOLUME_STATUS_POSITION);
        VOLUME_STATUS.publish_at(&families.status, &labels, VOLUME_STATUS_POSITION, &volume.status);
    }

    async fn publish_summary(&self, api: &dyn CloudApi, registry: &MetricsRegistry) -> ApiResult<()> {
        let usage = registry
            .requests
            .observe("volume_quotasets_usage", "get", api.volume_quota_usage())
            .await?;

        publish_quota(&registry.storage.quota_volumes, &usage.volumes);
        publish_quota(&registry.storage.quota_gigabytes, &usage.gigabytes);
        Ok(())
    }
}
