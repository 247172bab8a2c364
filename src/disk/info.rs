//! Disk Aggregate
//!
//! `DiskInfo` is the mutable per-device record every observation source
//! writes into. It carries no synchronization of its own: whoever owns it
//! must serialize mutations (see [`crate::registry::DiskRegistry`]).

use super::identifiers::ProbeIdentifiers;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Constants
// =============================================================================

/// Node attribute holding the node's hostname
pub const HOSTNAME_KEY: &str = "hostname";

/// Node attribute holding the Kubernetes node name
pub const NODE_NAME_KEY: &str = "nodename";

/// Filesystem value udev reports for a device without a filesystem
pub const FS_NONE: &str = "None";

// =============================================================================
// Classification
// =============================================================================

/// Kind of block device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    /// Regular physical disk
    #[default]
    Disk,
    /// Sparse file backed disk
    Sparse,
    /// Partition of a disk
    Partition,
}

impl DiskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskType::Disk => "disk",
            DiskType::Sparse => "sparse",
            DiskType::Partition => "partition",
        }
    }
}

impl std::fmt::Display for DiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media type of a drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveType {
    #[serde(rename = "HDD")]
    Hdd,
    #[serde(rename = "SSD")]
    Ssd,
    #[default]
    Unknown,
}

impl DriveType {
    /// Derive the drive type from a rotation rate code
    pub fn from_rotation_rate(rate: u16) -> Self {
        match rate {
            0 => DriveType::Unknown,
            1 => DriveType::Ssd,
            _ => DriveType::Hdd,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriveType::Hdd => "HDD",
            DriveType::Ssd => "SSD",
            DriveType::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for DriveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Nested Records
// =============================================================================

/// Filesystem found on a disk or partition.
///
/// `file_system == None` means no filesystem; `Some("")` means a filesystem
/// whose type could not be named.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemInfo {
    #[serde(default)]
    pub file_system: Option<String>,

    #[serde(default)]
    pub mount_point: String,
}

impl FileSystemInfo {
    /// Build from raw probe output, mapping udev's `None` marker to absent
    pub fn from_probe(file_system: &str, mount_point: &str) -> Self {
        let file_system = if file_system.eq_ignore_ascii_case(FS_NONE) {
            None
        } else {
            Some(file_system.to_string())
        };
        Self {
            file_system,
            mount_point: mount_point.to_string(),
        }
    }

    /// Filesystem present with the given type and mount point
    pub fn mounted(file_system: impl Into<String>, mount_point: impl Into<String>) -> Self {
        Self {
            file_system: Some(file_system.into()),
            mount_point: mount_point.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.file_system.is_some()
    }
}

/// A partition on a disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    /// Partition type code, e.g. 83 or 8e
    #[serde(default)]
    pub partition_type: String,

    #[serde(default)]
    pub file_system: FileSystemInfo,
}

/// Temperature block reported by a health reader, in whole degrees Celsius
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureInfo {
    /// `current` is meaningful only when set
    #[serde(default)]
    pub data_valid: bool,
    #[serde(default)]
    pub current: i16,
    #[serde(default)]
    pub highest_valid: bool,
    /// Lifetime highest
    #[serde(default)]
    pub highest: i16,
    #[serde(default)]
    pub lowest_valid: bool,
    /// Lifetime lowest
    #[serde(default)]
    pub lowest: i16,
}

impl TemperatureInfo {
    /// Valid block with only a current reading
    pub fn current(celsius: i16) -> Self {
        Self {
            data_valid: true,
            current: celsius,
            ..Default::default()
        }
    }

    pub fn with_highest(mut self, celsius: i16) -> Self {
        self.highest_valid = true;
        self.highest = celsius;
        self
    }

    pub fn with_lowest(mut self, celsius: i16) -> Self {
        self.lowest_valid = true;
        self.lowest = celsius;
        self
    }
}

// =============================================================================
// Disk Info
// =============================================================================

/// Everything known about one physical disk.
///
/// Fields start at their zero value, which means "not observed yet".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskInfo {
    pub probe_identifiers: ProbeIdentifiers,
    /// Node attributes such as hostname and failure domain
    pub node_attributes: BTreeMap<String, String>,
    pub disk_type: DiskType,
    /// Follows the rotation rate unless a reader reported it outright
    pub drive_type: DriveType,
    pub drive_type_reported: bool,

    /// Capacity in bytes
    pub capacity: u64,
    pub logical_sector_size: u32,
    pub physical_sector_size: u32,
    pub model: String,
    pub serial: String,
    pub vendor: String,
    pub firmware_revision: String,
    /// Implemented standard, e.g. SPC-4
    pub compliance: String,
    /// 0 = not reported, 1 = solid state, otherwise RPM
    pub rotation_rate: u16,

    /// Device path, e.g. /dev/sda
    pub path: String,
    pub by_id_devlinks: IndexSet<String>,
    pub by_path_devlinks: IndexSet<String>,

    pub file_system: FileSystemInfo,
    pub partitions: Vec<PartitionInfo>,

    pub total_bytes_read: u64,
    pub total_bytes_written: u64,
    pub device_utilization_rate: f64,
    pub percent_endurance_used: f64,
    pub temperature: TemperatureInfo,
}

impl DiskInfo {
    /// Create an empty aggregate classified as a regular disk
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty aggregate for the given identifiers
    pub fn with_identifiers(probe_identifiers: ProbeIdentifiers) -> Self {
        Self {
            probe_identifiers,
            ..Self::default()
        }
    }

    /// Stable id of the disk
    pub fn uuid(&self) -> &str {
        &self.probe_identifiers.uuid
    }

    /// Name of the node the disk is attached to, empty when unknown
    pub fn node_name(&self) -> &str {
        self.node_attributes
            .get(HOSTNAME_KEY)
            .or_else(|| self.node_attributes.get(NODE_NAME_KEY))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn set_node_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.node_attributes.insert(key.into(), value.into());
    }

    /// Append a by-id link unless already known
    pub fn add_by_id_devlink(&mut self, link: impl Into<String>) -> bool {
        self.by_id_devlinks.insert(link.into())
    }

    /// Append a by-path link unless already known
    pub fn add_by_path_devlink(&mut self, link: impl Into<String>) -> bool {
        self.by_path_devlinks.insert(link.into())
    }

    /// Replace the partition collection
    pub fn set_partitions(&mut self, partitions: Vec<PartitionInfo>) {
        self.partitions = partitions;
    }

    /// Replace the temperature block
    pub fn set_temperature(&mut self, temperature: TemperatureInfo) {
        self.temperature = temperature;
    }

    /// Check if no source has written anything yet
    #[cfg(test)]
    pub(crate) fn is_unpopulated(&self) -> bool {
        let mut blank = DiskInfo::with_identifiers(self.probe_identifiers.clone());
        blank.node_attributes = self.node_attributes.clone();
        *self == blank
    }
}
