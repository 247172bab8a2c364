//! Domain Ports - boundaries between the disk core and the outside world
//!
//! Observation sources push facts in through [`crate::registry::DiskRegistry`];
//! exported resources leave through a [`DiskPublisher`]. Adapters implement
//! the publisher for a concrete control-plane store.

use crate::crd::Disk;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

// =============================================================================
// Disk Publisher Port
// =============================================================================

/// Port for handing exported disks to the control-plane store
#[async_trait]
pub trait DiskPublisher: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &str;

    /// Create or update the stored resource
    async fn publish(&self, disk: &Disk) -> Result<()>;

    /// Mark a disk as no longer attached; the store keeps the resource
    async fn retire(&self, name: &str) -> Result<()>;

    /// Names of stored disks that are still active
    async fn active_names(&self) -> Result<Vec<String>>;

    /// Publish several disks, stopping at the first failure
    async fn publish_all(&self, disks: &[Disk]) -> Result<usize> {
        for disk in disks {
            self.publish(disk).await?;
        }
        Ok(disks.len())
    }
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type DiskPublisherRef = Arc<dyn DiskPublisher>;
