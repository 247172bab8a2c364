//! Observation Log
//!
//! Recorded observations, one record per probe report, replayed through a
//! [`DiskRegistry`]. Logs are YAML unless the file name ends in `.json`.
//!
//! ```yaml
//! - identifiers:
//!     uuid: disk-3d8b1a
//!     udevIdentifier: /sys/devices/pci0000:00/0000:00:1f.2/ata1/host0/target0:0:0/0:0:0:0/block/sdb
//!   observation:
//!     source: udev
//!     path: /dev/sdb
//!     byIdLinks: [/dev/disk/by-id/ata-ST4000NM0033_Z1Z0ABCD]
//! - identifiers: { uuid: disk-3d8b1a }
//!   removed: true
//! ```

use crate::disk::{Observation, ProbeIdentifiers, HOSTNAME_KEY};
use crate::error::{Error, Result};
use crate::registry::DiskRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// One recorded probe report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    pub identifiers: ProbeIdentifiers,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<Observation>,

    /// The event monitor reported the device as gone
    #[serde(default)]
    pub removed: bool,
}

/// Outcome of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub removed: usize,
    /// Records skipped because their identifiers were rejected
    pub rejected: usize,
}

/// Read an observation log
pub fn load_observations(path: impl AsRef<Path>) -> Result<Vec<ObservationRecord>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let records: Vec<ObservationRecord> = if is_json {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    info!(path = %path.display(), records = records.len(), "Loaded observation log");
    Ok(records)
}

/// Replay records in order.
///
/// Records with rejected identifiers are logged and skipped; any other
/// failure aborts the replay. `default_node` is then recorded as the
/// hostname of every disk that ended up without a node name.
pub fn replay(
    registry: &DiskRegistry,
    records: Vec<ObservationRecord>,
    default_node: Option<&str>,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for record in records {
        let uuid = record.identifiers.uuid.clone();
        let result = if record.removed {
            registry.remove(&uuid).map(|_| summary.removed += 1)
        } else {
            let outcome = match record.observation {
                Some(observation) => registry.observe(&record.identifiers, observation),
                None => registry.register(&record.identifiers).map(|_| ()),
            };
            outcome.map(|_| summary.applied += 1)
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_identity_error() => {
                warn!(uuid = %uuid, error = %e, "Skipping observation record");
                summary.rejected += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(node) = default_node {
        for uuid in registry.uuids() {
            registry.update(&uuid, |disk| {
                if disk.node_name().is_empty() {
                    disk.set_node_attribute(HOSTNAME_KEY, node);
                }
            })?;
        }
    }

    debug!(?summary, "Replay finished");
    Ok(summary)
}

/// Load and replay an observation log in one step
pub fn replay_file(
    registry: &DiskRegistry,
    path: impl AsRef<Path>,
    default_node: Option<&str>,
) -> Result<ReplaySummary> {
    let records = load_observations(path.as_ref()).map_err(|e| match e {
        Error::Io(io) => Error::Configuration(format!(
            "cannot read observation log {}: {}",
            path.as_ref().display(),
            io
        )),
        other => other,
    })?;
    replay(registry, records, default_node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::ProbeSource;
    use assert_matches::assert_matches;
    use std::io::Write;

    const LOG: &str = r#"
- identifiers:
    uuid: disk-3d8b1a
    udevIdentifier: /sys/block/sdb
  observation:
    source: udev
    path: /dev/sdb
    capacity: 1000000000000
    logicalSectorSize: 512
    physicalSectorSize: 4096
    byIdLinks: [a, b]
    fileSystem: None
- identifiers:
    uuid: disk-3d8b1a
    smartIdentifier: /dev/sdb
  observation:
    source: smart
    model: X
    temperature:
      dataValid: false
      current: 42
- identifiers:
    uuid: disk-77aa
    smartIdentifier: /dev/sdb
  observation:
    source: smart
    model: Y
- identifiers:
    uuid: disk-90ff
- identifiers:
    uuid: disk-90ff
  removed: true
"#;

    fn write_log(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_yaml_log() {
        let file = write_log(".yaml", LOG);
        let records = load_observations(file.path()).unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(
            records[0].observation.as_ref().map(Observation::source),
            Some(ProbeSource::Udev)
        );
        assert!(records[3].observation.is_none());
        assert!(records[4].removed);
    }

    #[test]
    fn test_load_json_log() {
        let json = r#"[{"identifiers": {"uuid": "disk-1"}, "observation": {"source": "mount", "fileSystem": "xfs", "mountPoint": "/data"}}]"#;
        let file = write_log(".json", json);
        let records = load_observations(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].observation.as_ref().map(Observation::source),
            Some(ProbeSource::Mount)
        );
    }

    #[test]
    fn test_replay_correlates_and_rejects() {
        let file = write_log(".yaml", LOG);
        let registry = DiskRegistry::new();

        let summary = replay_file(&registry, file.path(), Some("worker-1")).unwrap();
        assert_eq!(
            summary,
            ReplaySummary {
                applied: 3,
                removed: 1,
                rejected: 1,
            }
        );
        assert_eq!(registry.uuids(), vec!["disk-3d8b1a"]);

        let disk = registry.export("disk-3d8b1a").unwrap();
        assert_eq!(disk.node_name(), Some("worker-1"));
        assert_eq!(disk.spec.path, "/dev/sdb");
        assert_eq!(disk.spec.details.model, "X");
        assert_eq!(disk.spec.devlinks.len(), 1);
        assert!(!disk.spec.file_system.is_present());
        assert!(disk.stats.temperature.is_empty());
    }

    #[test]
    fn test_default_node_does_not_override_reported_hostname() {
        let log = r#"
- identifiers: { uuid: disk-1 }
  observation:
    source: udev
    nodeAttributes: { hostname: worker-7 }
- identifiers: { uuid: disk-1 }
  observation: { source: udev, path: /dev/sdc }
- identifiers: { uuid: disk-2 }
"#;
        let file = write_log(".yml", log);
        let registry = DiskRegistry::new();
        replay_file(&registry, file.path(), Some("worker-1")).unwrap();

        assert_eq!(registry.export("disk-1").unwrap().node_name(), Some("worker-7"));
        assert_eq!(registry.export("disk-2").unwrap().node_name(), Some("worker-1"));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let registry = DiskRegistry::new();
        let result = replay_file(&registry, "/nonexistent/observations.yaml", None);
        assert_matches!(result, Err(Error::Configuration(_)));
    }

    #[test]
    fn test_malformed_log() {
        let file = write_log(".yaml", "- identifiers: 42\n");
        assert_matches!(load_observations(file.path()), Err(Error::YamlParse(_)));
    }
}
