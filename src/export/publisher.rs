//! Disk Publishers
//!
//! Adapters for the [`DiskPublisher`] port: an in-memory store used by
//! tests and dry runs, and a Kubernetes store using server-side apply.

use crate::crd::{Disk, DiskState, HOSTNAME_LABEL, MANAGED_LABEL};
use crate::domain::ports::DiskPublisher;
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, Resource};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// =============================================================================
// Memory Publisher
// =============================================================================

/// Keeps the latest published version of every disk in memory
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    disks: RwLock<BTreeMap<String, Disk>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest published version of a disk
    pub fn get(&self, name: &str) -> Option<Disk> {
        self.disks.read().get(name).cloned()
    }

    /// Names of all published disks, sorted
    pub fn names(&self) -> Vec<String> {
        self.disks.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.disks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.disks.read().is_empty()
    }
}

#[async_trait]
impl DiskPublisher for MemoryPublisher {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, disk: &Disk) -> Result<()> {
        ensure_named(disk)?;
        self.disks
            .write()
            .insert(disk.name().to_string(), disk.clone());
        Ok(())
    }

    async fn retire(&self, name: &str) -> Result<()> {
        let mut disks = self.disks.write();
        let disk = disks.get_mut(name).ok_or_else(|| Error::DiskNotFound {
            uuid: name.to_string(),
        })?;
        disk.status.state = DiskState::Inactive;
        Ok(())
    }

    async fn active_names(&self) -> Result<Vec<String>> {
        Ok(self
            .disks
            .read()
            .values()
            .filter(|disk| disk.is_active())
            .map(|disk| disk.name().to_string())
            .collect())
    }
}

// =============================================================================
// Kubernetes Publisher
// =============================================================================

/// Configuration for the Kubernetes publisher
#[derive(Debug, Clone)]
pub struct KubePublisherConfig {
    /// Field manager recorded for server-side apply
    pub field_manager: String,
    /// Take ownership of fields managed by someone else
    pub force: bool,
    /// Node whose disks this publisher owns. Without it every managed
    /// Disk in the cluster counts as owned.
    pub node_name: Option<String>,
}

impl Default for KubePublisherConfig {
    fn default() -> Self {
        Self {
            field_manager: "node-disk-manager".to_string(),
            force: true,
            node_name: None,
        }
    }
}

/// Publishes disks to the cluster as cluster-scoped Disk resources
pub struct KubePublisher {
    api: Api<Disk>,
    config: KubePublisherConfig,
}

impl KubePublisher {
    /// Create a publisher on an existing client
    pub fn new(client: Client, config: KubePublisherConfig) -> Self {
        Self {
            api: Api::all(client),
            config,
        }
    }

    /// Create a publisher from the ambient kubeconfig or in-cluster config
    pub async fn try_default(config: KubePublisherConfig) -> Result<Self> {
        let client = Client::try_default().await?;
        info!(field_manager = %config.field_manager, "Kubernetes publisher initialized");
        Ok(Self::new(client, config))
    }

    /// Label selector matching the Disks this publisher owns
    fn owned_selector(&self) -> String {
        match &self.config.node_name {
            Some(node) => format!("{}=true,{}={}", MANAGED_LABEL, HOSTNAME_LABEL, node),
            None => format!("{}=true", MANAGED_LABEL),
        }
    }

    fn apply_params(&self) -> PatchParams {
        let params = PatchParams::apply(&self.config.field_manager);
        if self.config.force {
            params.force()
        } else {
            params
        }
    }
}

#[async_trait]
impl DiskPublisher for KubePublisher {
    fn name(&self) -> &str {
        "kubernetes"
    }

    async fn publish(&self, disk: &Disk) -> Result<()> {
        ensure_named(disk)?;
        self.api
            .patch(disk.name(), &self.apply_params(), &Patch::Apply(disk))
            .await
            .map_err(|e| {
                warn!(disk = disk.name(), error = %e, "Failed to apply disk");
                Error::Kube(e)
            })?;
        debug!(disk = disk.name(), "Disk applied");
        Ok(())
    }

    async fn retire(&self, name: &str) -> Result<()> {
        let patch = serde_json::json!({
            "apiVersion": Disk::api_version(&()),
            "kind": Disk::kind(&()),
            "status": { "state": DiskState::Inactive },
        });
        self.api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        info!(disk = name, "Disk marked inactive");
        Ok(())
    }

    async fn active_names(&self) -> Result<Vec<String>> {
        let params = ListParams::default().labels(&self.owned_selector());
        let disks = self.api.list(&params).await?;
        Ok(disks
            .items
            .iter()
            .filter(|disk| disk.is_active())
            .map(|disk| disk.name().to_string())
            .collect())
    }
}

fn ensure_named(disk: &Disk) -> Result<()> {
    if disk.name().is_empty() {
        return Err(Error::PublishFailed {
            name: String::new(),
            reason: "disk has no name".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_memory_publish_and_retire() {
        let publisher = MemoryPublisher::new();
        let mut disk = Disk::new("disk-1");
        disk.spec.path = "/dev/sda".into();

        publisher.publish(&disk).await.unwrap();
        disk.spec.path = "/dev/sdb".into();
        publisher.publish(&disk).await.unwrap();

        assert_eq!(publisher.len(), 1);
        assert_eq!(publisher.get("disk-1").unwrap().spec.path, "/dev/sdb");

        publisher.retire("disk-1").await.unwrap();
        assert_eq!(
            publisher.get("disk-1").unwrap().status.state,
            DiskState::Inactive
        );
    }

    #[tokio::test]
    async fn test_memory_retire_unknown() {
        let publisher = MemoryPublisher::new();
        assert_matches!(
            publisher.retire("disk-404").await,
            Err(Error::DiskNotFound { .. })
        );
    }

    #[test]
    fn test_unnamed_disk_rejected() {
        let publisher = MemoryPublisher::new();
        let result = tokio_test::block_on(publisher.publish(&Disk::new("")));
        assert_matches!(result, Err(Error::PublishFailed { .. }));
        assert!(publisher.is_empty());
    }

    #[tokio::test]
    async fn test_publish_all() {
        let publisher = MemoryPublisher::new();
        let disks = vec![Disk::new("disk-b"), Disk::new("disk-a")];

        assert_eq!(publisher.publish_all(&disks).await.unwrap(), 2);
        assert_eq!(publisher.names(), vec!["disk-a", "disk-b"]);
    }

    #[tokio::test]
    async fn test_memory_active_names() {
        let publisher = MemoryPublisher::new();
        publisher
            .publish_all(&[Disk::new("disk-a"), Disk::new("disk-b")])
            .await
            .unwrap();
        publisher.retire("disk-a").await.unwrap();

        assert_eq!(publisher.active_names().await.unwrap(), vec!["disk-b"]);
    }

    #[test]
    fn test_kube_publisher_config_defaults() {
        let config = KubePublisherConfig::default();
        assert_eq!(config.field_manager, "node-disk-manager");
        assert!(config.force);
        assert!(config.node_name.is_none());
    }
}
