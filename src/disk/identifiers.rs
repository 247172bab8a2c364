//! Probe Identifiers
//!
//! Each observation source re-identifies a device by its own key: udev by
//! sysfs path, the SMART and SeaChest readers and the mount reader by device
//! path. The stable uuid ties all of them to one disk.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Observation sources feeding a disk aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeSource {
    /// Device-event monitor
    Udev,
    /// Health/SMART reader
    Smart,
    /// Vendor diagnostics reader
    Seachest,
    /// Mount-table reader
    Mount,
}

impl ProbeSource {
    /// All sources in a fixed order
    pub const ALL: [ProbeSource; 4] = [
        ProbeSource::Udev,
        ProbeSource::Smart,
        ProbeSource::Seachest,
        ProbeSource::Mount,
    ];
}

impl std::fmt::Display for ProbeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeSource::Udev => write!(f, "udev"),
            ProbeSource::Smart => write!(f, "smart"),
            ProbeSource::Seachest => write!(f, "seachest"),
            ProbeSource::Mount => write!(f, "mount"),
        }
    }
}

/// Keys correlating the observations of one physical device.
///
/// Two identifier sets are equal when their uuids are equal; the source keys
/// do not take part in comparison.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeIdentifiers {
    /// Stable id assigned when the device is first observed
    pub uuid: String,

    /// Sysfs path used by the udev monitor
    #[serde(default)]
    pub udev_identifier: String,

    /// Device path used by the SMART reader
    #[serde(default)]
    pub smart_identifier: String,

    /// Device path used by the SeaChest reader
    #[serde(default)]
    pub seachest_identifier: String,

    /// Device path used by the mount reader
    #[serde(default)]
    pub mount_identifier: String,
}

impl ProbeIdentifiers {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Default::default()
        }
    }

    /// Set the key of one source
    pub fn with_key(mut self, source: ProbeSource, key: impl Into<String>) -> Self {
        *self.slot_mut(source) = key.into();
        self
    }

    fn slot_mut(&mut self, source: ProbeSource) -> &mut String {
        match source {
            ProbeSource::Udev => &mut self.udev_identifier,
            ProbeSource::Smart => &mut self.smart_identifier,
            ProbeSource::Seachest => &mut self.seachest_identifier,
            ProbeSource::Mount => &mut self.mount_identifier,
        }
    }

    /// Key used by a source, empty if that source never saw the device
    pub fn key_for(&self, source: ProbeSource) -> &str {
        match source {
            ProbeSource::Udev => &self.udev_identifier,
            ProbeSource::Smart => &self.smart_identifier,
            ProbeSource::Seachest => &self.seachest_identifier,
            ProbeSource::Mount => &self.mount_identifier,
        }
    }

    /// Non-empty source keys
    pub fn source_keys(&self) -> impl Iterator<Item = (ProbeSource, &str)> + '_ {
        ProbeSource::ALL
            .into_iter()
            .map(move |source| (source, self.key_for(source)))
            .filter(|(_, key)| !key.is_empty())
    }

    /// Replace the key of one source, returning the previous one
    pub(crate) fn replace_key(&mut self, source: ProbeSource, key: &str) -> Option<String> {
        let slot = self.slot_mut(source);
        if slot.as_str() == key {
            return None;
        }
        let previous = std::mem::replace(slot, key.to_string());
        (!previous.is_empty()).then_some(previous)
    }
}

impl PartialEq for ProbeIdentifiers {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for ProbeIdentifiers {}

impl Hash for ProbeIdentifiers {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_by_uuid_only() {
        let a = ProbeIdentifiers::new("disk-1").with_key(ProbeSource::Udev, "/sys/block/sda");
        let b = ProbeIdentifiers::new("disk-1").with_key(ProbeSource::Smart, "/dev/sda");
        let c = ProbeIdentifiers::new("disk-2").with_key(ProbeSource::Udev, "/sys/block/sda");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_source_keys_skip_empty() {
        let ids = ProbeIdentifiers::new("disk-1")
            .with_key(ProbeSource::Udev, "/sys/block/sdb")
            .with_key(ProbeSource::Mount, "/dev/sdb");

        let keys: Vec<_> = ids.source_keys().collect();
        assert_eq!(
            keys,
            vec![(ProbeSource::Udev, "/sys/block/sdb"), (ProbeSource::Mount, "/dev/sdb")]
        );
        assert_eq!(ids.key_for(ProbeSource::Smart), "");
    }

    #[test]
    fn test_replace_key_reports_previous() {
        let mut ids = ProbeIdentifiers::new("disk-1").with_key(ProbeSource::Smart, "/dev/sda");

        assert_eq!(ids.replace_key(ProbeSource::Smart, "/dev/sda"), None);
        assert_eq!(ids.replace_key(ProbeSource::Seachest, "/dev/sda"), None);
        assert_eq!(
            ids.replace_key(ProbeSource::Smart, "/dev/sdc"),
            Some("/dev/sda".to_string())
        );
        assert_eq!(ids.smart_identifier, "/dev/sdc");
        assert_eq!(ids.seachest_identifier, "/dev/sda");
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ProbeSource::Seachest.to_string(), "seachest");
        assert_eq!(ProbeSource::Udev.to_string(), "udev");
    }
}
