//! Observations
//!
//! One typed entry point per observation source. A field left as `None`
//! was not observed and leaves the aggregate untouched. Static hardware
//! facts are only filled in: a blank string or a zero number never
//! overwrites a value that an earlier observation supplied. Strings that
//! are filled in are stored exactly as reported, padding included.

use super::identifiers::ProbeSource;
use super::info::{DiskInfo, DiskType, DriveType, FileSystemInfo, PartitionInfo, TemperatureInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// =============================================================================
// Per-Source Observations
// =============================================================================

/// Facts reported by the device-event monitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UdevObservation {
    pub path: Option<String>,
    pub by_id_links: Vec<String>,
    pub by_path_links: Vec<String>,
    pub capacity: Option<u64>,
    pub logical_sector_size: Option<u32>,
    pub physical_sector_size: Option<u32>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub vendor: Option<String>,
    pub disk_type: Option<DiskType>,
    /// `ID_ATA_ROTATION_RATE_RPM`
    pub rotation_rate: Option<u16>,
    /// Derived from the queue's `rotational` attribute
    pub drive_type: Option<DriveType>,
    /// Raw `ID_FS_TYPE`, `None` when the device has no filesystem
    pub file_system: Option<String>,
    pub node_attributes: BTreeMap<String, String>,
}

/// Facts reported by the SMART reader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SmartObservation {
    pub model: Option<String>,
    pub serial: Option<String>,
    pub vendor: Option<String>,
    pub firmware_revision: Option<String>,
    pub compliance: Option<String>,
    pub rotation_rate: Option<u16>,
    pub capacity: Option<u64>,
    pub logical_sector_size: Option<u32>,
    pub physical_sector_size: Option<u32>,
    pub total_bytes_read: Option<u64>,
    pub total_bytes_written: Option<u64>,
    pub device_utilization_rate: Option<f64>,
    pub percent_endurance_used: Option<f64>,
    pub temperature: Option<TemperatureInfo>,
}

/// Facts reported by the SeaChest diagnostics reader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeachestObservation {
    pub model: Option<String>,
    pub serial: Option<String>,
    pub vendor: Option<String>,
    pub firmware_revision: Option<String>,
    pub drive_type: Option<DriveType>,
    pub rotation_rate: Option<u16>,
    pub capacity: Option<u64>,
    pub logical_sector_size: Option<u32>,
    pub physical_sector_size: Option<u32>,
    pub total_bytes_read: Option<u64>,
    pub total_bytes_written: Option<u64>,
    pub device_utilization_rate: Option<f64>,
    pub percent_endurance_used: Option<f64>,
    pub temperature: Option<TemperatureInfo>,
}

/// A partition as seen in the mount table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartitionObservation {
    pub partition_type: String,
    /// Raw filesystem type, `None` when the partition has no filesystem
    pub file_system: String,
    pub mount_point: String,
}

/// Facts reported by the mount-table reader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MountObservation {
    /// Raw filesystem type, `None` when the device has no filesystem
    pub file_system: Option<String>,
    /// Empty when the device is not mounted
    pub mount_point: Option<String>,
    /// Replaces the partition collection when present
    pub partitions: Option<Vec<PartitionObservation>>,
}

/// An observation from any source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Observation {
    Udev(UdevObservation),
    Smart(SmartObservation),
    Seachest(SeachestObservation),
    Mount(MountObservation),
}

impl Observation {
    /// Source that produced the observation
    pub fn source(&self) -> ProbeSource {
        match self {
            Observation::Udev(_) => ProbeSource::Udev,
            Observation::Smart(_) => ProbeSource::Smart,
            Observation::Seachest(_) => ProbeSource::Seachest,
            Observation::Mount(_) => ProbeSource::Mount,
        }
    }
}

impl From<UdevObservation> for Observation {
    fn from(obs: UdevObservation) -> Self {
        Observation::Udev(obs)
    }
}

impl From<SmartObservation> for Observation {
    fn from(obs: SmartObservation) -> Self {
        Observation::Smart(obs)
    }
}

impl From<SeachestObservation> for Observation {
    fn from(obs: SeachestObservation) -> Self {
        Observation::Seachest(obs)
    }
}

impl From<MountObservation> for Observation {
    fn from(obs: MountObservation) -> Self {
        Observation::Mount(obs)
    }
}

// =============================================================================
// Field Helpers
// =============================================================================

fn fill_str(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            *slot = value;
        }
    }
}

fn fill_num<T: Copy + Default + PartialEq>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        if value != T::default() {
            *slot = value;
        }
    }
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

// =============================================================================
// Apply
// =============================================================================

impl DiskInfo {
    /// Fold an observation from any source into the aggregate
    pub fn apply(&mut self, observation: Observation) {
        debug!(uuid = %self.uuid(), source = %observation.source(), "Applying observation");
        match observation {
            Observation::Udev(obs) => self.apply_udev(obs),
            Observation::Smart(obs) => self.apply_smart(obs),
            Observation::Seachest(obs) => self.apply_seachest(obs),
            Observation::Mount(obs) => self.apply_mount(obs),
        }
    }

    pub fn apply_udev(&mut self, obs: UdevObservation) {
        fill_str(&mut self.path, obs.path);
        for link in obs.by_id_links {
            self.add_by_id_devlink(link);
        }
        for link in obs.by_path_links {
            self.add_by_path_devlink(link);
        }
        fill_num(&mut self.capacity, obs.capacity);
        fill_num(&mut self.logical_sector_size, obs.logical_sector_size);
        fill_num(&mut self.physical_sector_size, obs.physical_sector_size);
        fill_str(&mut self.model, obs.model);
        fill_str(&mut self.serial, obs.serial);
        fill_str(&mut self.vendor, obs.vendor);
        replace(&mut self.disk_type, obs.disk_type);
        self.fill_rotation_rate(obs.rotation_rate);
        self.report_drive_type(obs.drive_type);
        if let Some(fs) = obs.file_system {
            self.file_system.file_system = FileSystemInfo::from_probe(&fs, "").file_system;
        }
        self.node_attributes.extend(obs.node_attributes);
    }

    pub fn apply_smart(&mut self, obs: SmartObservation) {
        fill_str(&mut self.model, obs.model);
        fill_str(&mut self.serial, obs.serial);
        fill_str(&mut self.vendor, obs.vendor);
        fill_str(&mut self.firmware_revision, obs.firmware_revision);
        fill_str(&mut self.compliance, obs.compliance);
        self.fill_rotation_rate(obs.rotation_rate);
        fill_num(&mut self.capacity, obs.capacity);
        fill_num(&mut self.logical_sector_size, obs.logical_sector_size);
        fill_num(&mut self.physical_sector_size, obs.physical_sector_size);
        replace(&mut self.total_bytes_read, obs.total_bytes_read);
        replace(&mut self.total_bytes_written, obs.total_bytes_written);
        replace(&mut self.device_utilization_rate, obs.device_utilization_rate);
        replace(&mut self.percent_endurance_used, obs.percent_endurance_used);
        replace(&mut self.temperature, obs.temperature);
    }

    pub fn apply_seachest(&mut self, obs: SeachestObservation) {
        fill_str(&mut self.model, obs.model);
        fill_str(&mut self.serial, obs.serial);
        fill_str(&mut self.vendor, obs.vendor);
        fill_str(&mut self.firmware_revision, obs.firmware_revision);
        self.fill_rotation_rate(obs.rotation_rate);
        self.report_drive_type(obs.drive_type);
        fill_num(&mut self.capacity, obs.capacity);
        fill_num(&mut self.logical_sector_size, obs.logical_sector_size);
        fill_num(&mut self.physical_sector_size, obs.physical_sector_size);
        replace(&mut self.total_bytes_read, obs.total_bytes_read);
        replace(&mut self.total_bytes_written, obs.total_bytes_written);
        replace(&mut self.device_utilization_rate, obs.device_utilization_rate);
        replace(&mut self.percent_endurance_used, obs.percent_endurance_used);
        replace(&mut self.temperature, obs.temperature);
    }

    pub fn apply_mount(&mut self, obs: MountObservation) {
        if let Some(fs) = obs.file_system {
            self.file_system.file_system = FileSystemInfo::from_probe(&fs, "").file_system;
        }
        replace(&mut self.file_system.mount_point, obs.mount_point);
        if let Some(partitions) = obs.partitions {
            self.set_partitions(
                partitions
                    .into_iter()
                    .map(|p| PartitionInfo {
                        file_system: FileSystemInfo::from_probe(&p.file_system, &p.mount_point),
                        partition_type: p.partition_type,
                    })
                    .collect(),
            );
        }
    }

    fn fill_rotation_rate(&mut self, rate: Option<u16>) {
        fill_num(&mut self.rotation_rate, rate);
        if !self.drive_type_reported {
            self.drive_type = DriveType::from_rotation_rate(self.rotation_rate);
        }
    }

    /// An explicitly reported drive type wins over the rotation rate
    fn report_drive_type(&mut self, drive_type: Option<DriveType>) {
        if let Some(drive_type) = drive_type.filter(|t| *t != DriveType::Unknown) {
            self.drive_type = drive_type;
            self.drive_type_reported = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::info::HOSTNAME_KEY;

    #[test]
    fn test_udev_populates_identity_facts() {
        let mut disk = DiskInfo::new();
        disk.apply_udev(UdevObservation {
            path: Some("/dev/sdb".into()),
            by_id_links: vec!["a".into(), "b".into(), "a".into()],
            capacity: Some(1_000_000_000_000),
            logical_sector_size: Some(512),
            physical_sector_size: Some(4096),
            file_system: Some("None".into()),
            node_attributes: [(HOSTNAME_KEY.to_string(), "worker-1".to_string())].into(),
            ..Default::default()
        });

        assert_eq!(disk.path, "/dev/sdb");
        assert_eq!(disk.by_id_devlinks.len(), 2);
        assert_eq!(disk.capacity, 1_000_000_000_000);
        assert_eq!(disk.physical_sector_size, 4096);
        assert!(!disk.file_system.is_present());
        assert_eq!(disk.node_name(), "worker-1");
    }

    #[test]
    fn test_empty_values_do_not_clobber() {
        let mut disk = DiskInfo::new();
        disk.apply_smart(SmartObservation {
            model: Some("ST4000NM0033".into()),
            serial: Some("Z1Z0ABCD".into()),
            capacity: Some(4_000_787_030_016),
            ..Default::default()
        });
        disk.apply_seachest(SeachestObservation {
            model: Some("  ".into()),
            serial: Some(String::new()),
            capacity: Some(0),
            vendor: Some("SEAGATE".into()),
            ..Default::default()
        });

        assert_eq!(disk.model, "ST4000NM0033");
        assert_eq!(disk.serial, "Z1Z0ABCD");
        assert_eq!(disk.capacity, 4_000_787_030_016);
        assert_eq!(disk.vendor, "SEAGATE");
    }

    #[test]
    fn test_last_non_empty_value_wins() {
        let mut disk = DiskInfo::new();
        disk.apply_udev(UdevObservation {
            model: Some("QEMU HARDDISK".into()),
            ..Default::default()
        });
        disk.apply_smart(SmartObservation {
            model: Some("Samsung SSD 860".into()),
            ..Default::default()
        });
        assert_eq!(disk.model, "Samsung SSD 860");
    }

    #[test]
    fn test_rotation_rate_sets_drive_type() {
        let mut disk = DiskInfo::new();
        disk.apply_smart(SmartObservation {
            rotation_rate: Some(1),
            ..Default::default()
        });
        assert_eq!(disk.drive_type, DriveType::Ssd);

        // An explicit report from the diagnostics reader takes precedence
        disk.apply_seachest(SeachestObservation {
            drive_type: Some(DriveType::Hdd),
            ..Default::default()
        });
        assert_eq!(disk.drive_type, DriveType::Hdd);
    }

    #[test]
    fn test_later_rotation_rate_rederives_drive_type() {
        let mut disk = DiskInfo::new();
        disk.apply_smart(SmartObservation {
            rotation_rate: Some(1),
            ..Default::default()
        });
        disk.apply_seachest(SeachestObservation {
            rotation_rate: Some(7200),
            ..Default::default()
        });

        let details = disk.to_disk().spec.details;
        assert_eq!(details.rotation_rate, 7200);
        assert_eq!(details.drive_type, "HDD");

        // A zero rate is not a report and changes nothing
        disk.apply_smart(SmartObservation {
            rotation_rate: Some(0),
            ..Default::default()
        });
        assert_eq!(disk.drive_type, DriveType::Hdd);
    }

    #[test]
    fn test_reported_drive_type_survives_rotation_rate() {
        let mut disk = DiskInfo::new();
        disk.apply_udev(UdevObservation {
            drive_type: Some(DriveType::Ssd),
            ..Default::default()
        });
        disk.apply_smart(SmartObservation {
            rotation_rate: Some(7200),
            ..Default::default()
        });
        assert_eq!(disk.rotation_rate, 7200);
        assert_eq!(disk.drive_type, DriveType::Ssd);

        // Unknown is not a report
        let mut disk = DiskInfo::new();
        disk.apply_seachest(SeachestObservation {
            drive_type: Some(DriveType::Unknown),
            rotation_rate: Some(5400),
            ..Default::default()
        });
        assert_eq!(disk.drive_type, DriveType::Hdd);
        assert!(!disk.drive_type_reported);
    }

    #[test]
    fn test_udev_rotation_rate() {
        let mut disk = DiskInfo::new();
        disk.apply_udev(UdevObservation {
            rotation_rate: Some(1),
            ..Default::default()
        });
        assert_eq!(disk.drive_type, DriveType::Ssd);
    }

    #[test]
    fn test_padded_strings_kept_verbatim() {
        let mut disk = DiskInfo::new();
        disk.apply_smart(SmartObservation {
            vendor: Some("ATA     ".into()),
            model: Some("  ST4000NM0033".into()),
            ..Default::default()
        });
        disk.apply_seachest(SeachestObservation {
            vendor: Some("   ".into()),
            ..Default::default()
        });

        let details = disk.to_disk().spec.details;
        assert_eq!(details.vendor, "ATA     ");
        assert_eq!(details.model, "  ST4000NM0033");
    }

    #[test]
    fn test_stats_and_temperature_replaced() {
        let mut disk = DiskInfo::new();
        disk.apply_smart(SmartObservation {
            total_bytes_read: Some(100),
            temperature: Some(TemperatureInfo::current(40).with_highest(55)),
            ..Default::default()
        });
        disk.apply_seachest(SeachestObservation {
            total_bytes_read: Some(250),
            temperature: Some(TemperatureInfo::current(38)),
            ..Default::default()
        });

        assert_eq!(disk.total_bytes_read, 250);
        assert_eq!(disk.temperature.current, 38);
        assert!(!disk.temperature.highest_valid);
    }

    #[test]
    fn test_mount_replaces_partitions() {
        let mut disk = DiskInfo::new();
        disk.apply_mount(MountObservation {
            file_system: Some("ext4".into()),
            mount_point: Some("/data".into()),
            partitions: Some(vec![PartitionObservation {
                partition_type: "83".into(),
                file_system: "xfs".into(),
                mount_point: "/old".into(),
            }]),
        });
        disk.apply_mount(MountObservation {
            partitions: Some(vec![
                PartitionObservation {
                    partition_type: "8e".into(),
                    file_system: "None".into(),
                    mount_point: String::new(),
                },
            ]),
            ..Default::default()
        });

        assert_eq!(disk.file_system, FileSystemInfo::mounted("ext4", "/data"));
        assert_eq!(disk.partitions.len(), 1);
        assert_eq!(disk.partitions[0].partition_type, "8e");
        assert!(!disk.partitions[0].file_system.is_present());
    }

    #[test]
    fn test_observation_deserialize_tagged() {
        let yaml = r#"
source: smart
model: WDC WD40EFRX
rotationRate: 5400
temperature:
  dataValid: true
  current: 33
"#;
        let obs: Observation = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(obs.source(), ProbeSource::Smart);

        let mut disk = DiskInfo::new();
        disk.apply(obs);
        assert_eq!(disk.model, "WDC WD40EFRX");
        assert_eq!(disk.rotation_rate, 5400);
        assert_eq!(disk.drive_type, DriveType::Hdd);
        assert_eq!(disk.temperature.current, 33);
    }
}
