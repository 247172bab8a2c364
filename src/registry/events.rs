//! Registry Events
//!
//! Events emitted by the disk registry so exporters can react to disks
//! appearing, changing and going away.

use crate::disk::ProbeSource;
use serde::{Deserialize, Serialize};

/// Events emitted by the disk registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A disk was observed for the first time
    DiskAdded { uuid: String },

    /// An observation was applied to a disk
    DiskUpdated { uuid: String, source: ProbeSource },

    /// A disk was discarded after the event monitor reported it gone
    DiskRemoved { uuid: String },

    /// A source key was presented for a second disk and rejected
    SourceKeyConflict {
        source: ProbeSource,
        key: String,
        existing: String,
        requested: String,
    },
}

impl RegistryEvent {
    /// Disk the event refers to
    pub fn uuid(&self) -> &str {
        match self {
            RegistryEvent::DiskAdded { uuid } => uuid,
            RegistryEvent::DiskUpdated { uuid, .. } => uuid,
            RegistryEvent::DiskRemoved { uuid } => uuid,
            RegistryEvent::SourceKeyConflict { requested, .. } => requested,
        }
    }

    /// Check if the exported resource of the disk needs to be refreshed
    pub fn requires_export(&self) -> bool {
        matches!(
            self,
            RegistryEvent::DiskAdded { .. } | RegistryEvent::DiskUpdated { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_uuid() {
        let event = RegistryEvent::DiskUpdated {
            uuid: "disk-1".to_string(),
            source: ProbeSource::Smart,
        };
        assert_eq!(event.uuid(), "disk-1");
        assert!(event.requires_export());

        let event = RegistryEvent::DiskRemoved {
            uuid: "disk-2".to_string(),
        };
        assert_eq!(event.uuid(), "disk-2");
        assert!(!event.requires_export());
    }

    #[test]
    fn test_conflict_refers_to_requested_disk() {
        let event = RegistryEvent::SourceKeyConflict {
            source: ProbeSource::Udev,
            key: "/sys/block/sda".to_string(),
            existing: "disk-a".to_string(),
            requested: "disk-b".to_string(),
        };
        assert_eq!(event.uuid(), "disk-b");
        assert!(!event.requires_export());
    }
}
