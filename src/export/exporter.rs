//! Disk Exporter
//!
//! Follows the registry's event stream and keeps the control-plane store in
//! step: added or updated disks are projected and published, removed disks
//! are retired.

use crate::domain::ports::DiskPublisherRef;
use crate::error::{Error, Result};
use crate::registry::{DiskRegistry, RegistryEvent};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Pushes registry changes to a publisher
pub struct Exporter {
    registry: Arc<DiskRegistry>,
    publisher: DiskPublisherRef,
}

impl Exporter {
    pub fn new(registry: Arc<DiskRegistry>, publisher: DiskPublisherRef) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    /// Publish every registered disk and retire stored disks the registry
    /// no longer knows. Returns the number of disks published.
    pub async fn sync_all(&self) -> Result<usize> {
        let disks = self.registry.export_all();
        let count = self.publisher.publish_all(&disks).await?;

        let mut retired = 0;
        for name in self.publisher.active_names().await? {
            if !self.registry.contains(&name) {
                self.publisher.retire(&name).await?;
                retired += 1;
            }
        }

        info!(count, retired, publisher = self.publisher.name(), "Synchronized all disks");
        Ok(count)
    }

    /// React to a single registry event
    pub async fn handle_event(&self, event: &RegistryEvent) -> Result<()> {
        match event {
            RegistryEvent::DiskAdded { uuid } | RegistryEvent::DiskUpdated { uuid, .. } => {
                match self.registry.export(uuid) {
                    Ok(disk) => self.publisher.publish(&disk).await,
                    // Removed between the event and the export
                    Err(Error::DiskNotFound { .. }) => {
                        debug!(uuid = %uuid, "Skipping export of removed disk");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            RegistryEvent::DiskRemoved { uuid } => self.publisher.retire(uuid).await,
            RegistryEvent::SourceKeyConflict { .. } => Ok(()),
        }
    }

    /// Run until the registry's event channel closes
    pub async fn run(self, mut events: broadcast::Receiver<RegistryEvent>) -> Result<()> {
        info!(publisher = self.publisher.name(), "Disk exporter started");
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(e) = self.handle_event(&event).await {
                        warn!(uuid = event.uuid(), error = %e, "Failed to export disk");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Exporter lagged behind registry, resyncing");
                    if let Err(e) = self.sync_all().await {
                        warn!(error = %e, "Failed to resync disks");
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Disk exporter stopped");
        Ok(())
    }
}
