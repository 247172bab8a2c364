//! Node Disk Manager - Disk Identity and Export
//!
//! Several independent probes report facts about the block devices of a
//! node: the device event monitor, SMART readers, the SeaChest utilities and
//! the mount table. This crate correlates those reports into one aggregate
//! per physical disk and projects the aggregate into the versioned `Disk`
//! resource stored by the cluster control plane.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │   udev   │ │  SMART   │ │ SeaChest │ │  mounts  │
//! └────┬─────┘ └────┬─────┘ └────┬─────┘ └────┬─────┘
//!      └────────────┴─────┬──────┴────────────┘
//!                         │ observations keyed by source key
//!              ┌──────────┴──────────┐
//!              │    Disk Registry    │  source key -> disk uuid
//!              │  DiskInfo per disk  │
//!              └──────────┬──────────┘
//!                         │ to_disk()
//!              ┌──────────┴──────────┐
//!              │  Disk (v1alpha1)    │ -> publisher / stdout
//!              └─────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`disk`]: Identifiers, the aggregate, probe observations and projection
//! - [`registry`]: Identity correlation across probes
//! - [`crd`]: The exported Disk resource
//! - [`export`]: Observation replay, rendering and publishing
//! - [`domain`]: Publisher port
//! - [`config`]: Export run configuration
//! - [`error`]: Error types and handling

pub mod config;
pub mod crd;
pub mod disk;
pub mod domain;
pub mod error;
pub mod export;
pub mod registry;

// Re-export commonly used types
pub use config::{ExportConfig, OutputFormat};

pub use crd::{
    Disk, DiskCapacity, DiskDetails, DiskDevLink, DiskSpec, DiskState, DiskStats, DiskStatus,
    DiskTemperature, FileSystemInfoSpec, Partition,
};

pub use disk::{
    DiskInfo, DiskType, DriveType, FileSystemInfo, Observation, PartitionInfo, ProbeIdentifiers,
    ProbeSource, TemperatureInfo,
};

pub use domain::ports::{DiskPublisher, DiskPublisherRef};

pub use error::{Error, Result};

pub use export::{Exporter, KubePublisher, KubePublisherConfig, MemoryPublisher};

pub use registry::{DiskRegistry, RegistryEvent, RegistryStatsSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
