//! Disk Projection
//!
//! Converts a [`DiskInfo`] aggregate into the exported [`Disk`] resource.
//! Projection reads the aggregate only and cannot fail: fields nobody
//! observed come out as their zero value.

use super::info::{DiskInfo, FileSystemInfo, TemperatureInfo};
use crate::crd::{
    Disk, DiskCapacity, DiskDetails, DiskDevLink, DiskSpec, DiskState, DiskStats, DiskStatus,
    DiskTemperature, FileSystemInfoSpec, Partition, BY_ID_LINK, BY_PATH_LINK, DISK_TYPE_LABEL,
    HOSTNAME_LABEL, MANAGED_LABEL,
};
use std::collections::BTreeMap;

/// Value of the managed label
const TRUE_STRING: &str = "true";

impl FileSystemInfo {
    /// Exported form; an absent filesystem exports neither type nor mount point
    pub fn to_export(&self) -> FileSystemInfoSpec {
        match &self.file_system {
            Some(fs_type) => FileSystemInfoSpec {
                fs_type: Some(fs_type.clone()),
                mount_point: Some(self.mount_point.clone()),
            },
            None => FileSystemInfoSpec::default(),
        }
    }
}

impl TemperatureInfo {
    /// Exported form; nothing is exported unless the reading is valid
    pub fn to_export(&self) -> DiskTemperature {
        if !self.data_valid {
            return DiskTemperature::default();
        }
        DiskTemperature {
            current_temperature: Some(self.current),
            highest_temperature: self.highest_valid.then_some(self.highest),
            lowest_temperature: self.lowest_valid.then_some(self.lowest),
        }
    }
}

impl DiskInfo {
    /// Project the aggregate into a Disk resource
    pub fn to_disk(&self) -> Disk {
        let mut disk = Disk::new(self.uuid());
        disk.metadata.labels = Some(self.labels());
        disk.status = self.status();
        disk.spec = self.spec();
        disk.stats = self.stats();
        disk
    }

    /// Project the partition collection, in order
    pub fn to_partitions(&self) -> Vec<Partition> {
        self.partitions
            .iter()
            .map(|partition| Partition {
                partition_type: partition.partition_type.clone(),
                file_system: partition.file_system.to_export(),
            })
            .collect()
    }

    fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (HOSTNAME_LABEL.to_string(), self.node_name().to_string()),
            (DISK_TYPE_LABEL.to_string(), self.disk_type.to_string()),
            (MANAGED_LABEL.to_string(), TRUE_STRING.to_string()),
        ])
    }

    // Liveness is decided by reconciliation; an exported disk is always active.
    fn status(&self) -> DiskStatus {
        DiskStatus {
            state: DiskState::Active,
        }
    }

    fn spec(&self) -> DiskSpec {
        DiskSpec {
            path: self.path.clone(),
            capacity: self.capacity(),
            details: self.details(),
            devlinks: self.devlinks(),
            file_system: self.file_system.to_export(),
        }
    }

    fn capacity(&self) -> DiskCapacity {
        DiskCapacity {
            storage: self.capacity,
            physical_sector_size: self.physical_sector_size,
            logical_sector_size: self.logical_sector_size,
        }
    }

    fn details(&self) -> DiskDetails {
        DiskDetails {
            rotation_rate: self.rotation_rate,
            drive_type: self.drive_type.to_string(),
            model: self.model.clone(),
            compliance: self.compliance.clone(),
            serial: self.serial.clone(),
            vendor: self.vendor.clone(),
            firmware_revision: self.firmware_revision.clone(),
        }
    }

    fn devlinks(&self) -> Vec<DiskDevLink> {
        [
            (BY_ID_LINK, &self.by_id_devlinks),
            (BY_PATH_LINK, &self.by_path_devlinks),
        ]
        .into_iter()
        .filter(|(_, links)| !links.is_empty())
        .map(|(kind, links)| DiskDevLink {
            kind: kind.to_string(),
            links: links.iter().cloned().collect(),
        })
        .collect()
    }

    fn stats(&self) -> DiskStats {
        DiskStats {
            temperature: self.temperature.to_export(),
            total_bytes_read: self.total_bytes_read,
            total_bytes_written: self.total_bytes_written,
            device_utilization_rate: self.device_utilization_rate,
            percent_endurance_used: self.percent_endurance_used,
        }
    }
}
