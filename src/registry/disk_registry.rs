//! Disk Registry
//!
//! Owns every disk aggregate on the node and enforces the identity
//! invariant: one aggregate per uuid, and each source key resolving to at
//! most one uuid. Mutations of a disk are serialized by a per-disk mutex,
//! changes to the identity indexes by a registry-wide lock.

use super::events::RegistryEvent;
use crate::crd::{Disk, Partition};
use crate::disk::{DiskInfo, Observation, ProbeIdentifiers, ProbeSource};
use crate::error::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

// =============================================================================
// Constants
// =============================================================================

/// Capacity of the event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Shared, lockable disk aggregate
pub type DiskHandle = Arc<Mutex<DiskInfo>>;

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Default)]
struct RegistryStats {
    registrations: AtomicU64,
    observations: AtomicU64,
    removals: AtomicU64,
    conflicts: AtomicU64,
}

/// Snapshot of registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStatsSnapshot {
    /// Disks currently registered
    pub disks: u64,
    pub registrations: u64,
    pub observations: u64,
    pub removals: u64,
    /// Rejected source keys
    pub conflicts: u64,
}

// =============================================================================
// Disk Registry
// =============================================================================

/// Registry of disk aggregates keyed by uuid
pub struct DiskRegistry {
    disks: DashMap<String, DiskHandle>,
    source_index: DashMap<(ProbeSource, String), String>,
    identity_lock: Mutex<()>,
    stats: RegistryStats,
    event_sender: broadcast::Sender<RegistryEvent>,
}

impl std::fmt::Debug for DiskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskRegistry")
            .field("disks", &self.disks.len())
            .field("source_keys", &self.source_index.len())
            .finish()
    }
}

impl Default for DiskRegistry {
    fn default() -> Self {
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            disks: DashMap::new(),
            source_index: DashMap::new(),
            identity_lock: Mutex::new(()),
            stats: RegistryStats::default(),
            event_sender,
        }
    }
}

impl DiskRegistry {
    /// Create a new shared registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get an event receiver
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_sender.subscribe()
    }

    /// Register the identifiers of a disk.
    ///
    /// Creates an empty aggregate for an unknown uuid, otherwise returns the
    /// existing one. Every non-empty source key is bound to the uuid; a key
    /// already bound to another uuid is rejected and nothing is changed.
    pub fn register(&self, ids: &ProbeIdentifiers) -> Result<DiskHandle> {
        if ids.uuid.trim().is_empty() {
            return Err(Error::InvalidIdentifier("empty uuid".into()));
        }
        let uuid = ids.uuid.as_str();

        let _identity = self.identity_lock.lock();

        for (source, key) in ids.source_keys() {
            if let Some(existing) = self.source_index.get(&(source, key.to_string())) {
                if existing.value() != uuid {
                    self.stats.conflicts.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        %source, key, existing = %existing.value(), requested = uuid,
                        "Rejecting source key bound to another disk"
                    );
                    let _ = self.event_sender.send(RegistryEvent::SourceKeyConflict {
                        source,
                        key: key.to_string(),
                        existing: existing.value().clone(),
                        requested: uuid.to_string(),
                    });
                    return Err(Error::SourceKeyConflict {
                        probe: source.to_string(),
                        key: key.to_string(),
                        existing: existing.value().clone(),
                        requested: uuid.to_string(),
                    });
                }
            }
        }

        let existing = self.disks.get(uuid).map(|handle| handle.value().clone());
        let (handle, created) = match existing {
            Some(handle) => (handle, false),
            None => {
                let handle = Arc::new(Mutex::new(DiskInfo::with_identifiers(
                    ProbeIdentifiers::new(uuid),
                )));
                self.disks.insert(uuid.to_string(), handle.clone());
                (handle, true)
            }
        };

        {
            let mut disk = handle.lock();
            for (source, key) in ids.source_keys() {
                if let Some(previous) = disk.probe_identifiers.replace_key(source, key) {
                    debug!(uuid, %source, previous = %previous, key, "Source key changed");
                    self.source_index.remove(&(source, previous));
                }
                self.source_index.insert((source, key.to_string()), uuid.to_string());
            }
        }

        if created {
            self.stats.registrations.fetch_add(1, Ordering::Relaxed);
            info!(uuid, "Disk registered");
            let _ = self.event_sender.send(RegistryEvent::DiskAdded {
                uuid: uuid.to_string(),
            });
        }

        Ok(handle)
    }

    /// Resolve a source key to the uuid of its disk
    pub fn resolve(&self, source: ProbeSource, key: &str) -> Option<String> {
        self.source_index
            .get(&(source, key.to_string()))
            .map(|uuid| uuid.value().clone())
    }

    /// Register the identifiers and apply an observation to the disk
    pub fn observe(&self, ids: &ProbeIdentifiers, observation: Observation) -> Result<()> {
        let handle = self.register(ids)?;
        self.apply(&ids.uuid, &handle, observation);
        Ok(())
    }

    /// Apply an observation to the disk a source key resolves to
    pub fn observe_by_key(
        &self,
        source: ProbeSource,
        key: &str,
        observation: Observation,
    ) -> Result<()> {
        let uuid = self
            .resolve(source, key)
            .ok_or_else(|| Error::SourceKeyNotFound {
                probe: source.to_string(),
                key: key.to_string(),
            })?;
        let handle = self.handle(&uuid)?;
        self.apply(&uuid, &handle, observation);
        Ok(())
    }

    fn apply(&self, uuid: &str, handle: &DiskHandle, observation: Observation) {
        let source = observation.source();
        handle.lock().apply(observation);
        self.stats.observations.fetch_add(1, Ordering::Relaxed);
        let _ = self.event_sender.send(RegistryEvent::DiskUpdated {
            uuid: uuid.to_string(),
            source,
        });
    }

    /// Run a closure against a disk while holding its lock
    pub fn update<R>(&self, uuid: &str, f: impl FnOnce(&mut DiskInfo) -> R) -> Result<R> {
        let handle = self.handle(uuid)?;
        let result = f(&mut *handle.lock());
        Ok(result)
    }

    /// Handle of a registered disk
    pub fn handle(&self, uuid: &str) -> Result<DiskHandle> {
        self.disks
            .get(uuid)
            .map(|handle| handle.value().clone())
            .ok_or_else(|| Error::DiskNotFound {
                uuid: uuid.to_string(),
            })
    }

    /// Snapshot of a disk aggregate
    pub fn get(&self, uuid: &str) -> Option<DiskInfo> {
        self.handle(uuid).ok().map(|handle| handle.lock().clone())
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.disks.contains_key(uuid)
    }

    pub fn len(&self) -> usize {
        self.disks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disks.is_empty()
    }

    /// All registered uuids, sorted
    pub fn uuids(&self) -> Vec<String> {
        let mut uuids: Vec<String> = self.disks.iter().map(|e| e.key().clone()).collect();
        uuids.sort();
        uuids
    }

    /// Discard a disk and release its source keys
    pub fn remove(&self, uuid: &str) -> Result<DiskInfo> {
        let _identity = self.identity_lock.lock();

        let (_, handle) = self.disks.remove(uuid).ok_or_else(|| Error::DiskNotFound {
            uuid: uuid.to_string(),
        })?;
        let disk = handle.lock().clone();

        for (source, key) in disk.probe_identifiers.source_keys() {
            self.source_index
                .remove_if(&(source, key.to_string()), |_, bound| bound == uuid);
        }

        self.stats.removals.fetch_add(1, Ordering::Relaxed);
        info!(uuid, path = %disk.path, "Disk removed");
        let _ = self.event_sender.send(RegistryEvent::DiskRemoved {
            uuid: uuid.to_string(),
        });

        Ok(disk)
    }

    /// Project a disk into its exported resource
    pub fn export(&self, uuid: &str) -> Result<Disk> {
        Ok(self.handle(uuid)?.lock().to_disk())
    }

    /// Project the partitions of a disk
    pub fn export_partitions(&self, uuid: &str) -> Result<Vec<Partition>> {
        Ok(self.handle(uuid)?.lock().to_partitions())
    }

    /// Project every disk, ordered by name
    pub fn export_all(&self) -> Vec<Disk> {
        let handles: Vec<DiskHandle> = self.disks.iter().map(|e| e.value().clone()).collect();
        let mut disks: Vec<Disk> = handles.iter().map(|h| h.lock().to_disk()).collect();
        disks.sort_by(|a, b| a.name().cmp(b.name()));
        disks
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            disks: self.disks.len() as u64,
            registrations: self.stats.registrations.load(Ordering::Relaxed),
            observations: self.stats.observations.load(Ordering::Relaxed),
            removals: self.stats.removals.load(Ordering::Relaxed),
            conflicts: self.stats.conflicts.load(Ordering::Relaxed),
        }
    }
}
