//! Disk CRD
//!
//! The exported, declarative representation of one physical block device
//! attached to a cluster node. Besides the usual spec and status a Disk
//! carries a top-level `stats` block with runtime counters, so the resource
//! and its CustomResourceDefinition are defined by hand instead of through
//! `#[derive(CustomResource)]`.

use crate::error::Result;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ClusterResourceScope;
use kube::Resource;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// =============================================================================
// Constants
// =============================================================================

/// API group of the Disk resource
pub const DISK_GROUP: &str = "openebs.io";

/// API version of the Disk resource
pub const DISK_VERSION: &str = "v1alpha1";

/// Kind of the Disk resource
pub const DISK_KIND: &str = "Disk";

/// Plural name of the Disk resource
pub const DISK_PLURAL: &str = "disks";

/// Label carrying the name of the node the disk is attached to
pub const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

/// Label carrying the disk classification
pub const DISK_TYPE_LABEL: &str = "ndm.io/disk-type";

/// Label marking resources managed by the disk manager
pub const MANAGED_LABEL: &str = "ndm.io/managed";

/// Devlink kind for `/dev/disk/by-id` links
pub const BY_ID_LINK: &str = "by-id";

/// Devlink kind for `/dev/disk/by-path` links
pub const BY_PATH_LINK: &str = "by-path";

// =============================================================================
// Disk Resource
// =============================================================================

/// Disk is the exported resource for a single block device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    /// `openebs.io/v1alpha1`
    pub api_version: String,

    /// `Disk`
    pub kind: String,

    /// Name, labels and annotations
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Static description of the device
    pub spec: DiskSpec,

    /// Lifecycle state
    #[serde(default)]
    pub status: DiskStatus,

    /// Runtime counters
    #[serde(default)]
    pub stats: DiskStats,
}

impl Disk {
    /// Create an empty Disk with the given name and type meta filled in
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: Self::api_version(&()).into_owned(),
            kind: DISK_KIND.to_string(),
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            spec: DiskSpec::default(),
            status: DiskStatus::default(),
            stats: DiskStats::default(),
        }
    }

    /// Resource name (the disk's stable id)
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Value of a metadata label
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    /// Node the disk is attached to
    pub fn node_name(&self) -> Option<&str> {
        self.label(HOSTNAME_LABEL)
    }

    /// Check if the disk is active
    pub fn is_active(&self) -> bool {
        self.status.state == DiskState::Active
    }

    /// Devlinks of a given kind
    pub fn devlinks(&self, kind: &str) -> Option<&[String]> {
        self.spec
            .devlinks
            .iter()
            .find(|link| link.kind == kind)
            .map(|link| link.links.as_slice())
    }
}

impl Resource for Disk {
    type DynamicType = ();
    type Scope = ClusterResourceScope;

    fn kind(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(DISK_KIND)
    }

    fn group(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(DISK_GROUP)
    }

    fn version(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(DISK_VERSION)
    }

    fn plural(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(DISK_PLURAL)
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

// =============================================================================
// CustomResourceDefinition
// =============================================================================

impl Disk {
    /// CustomResourceDefinition registering the Disk kind with the API server
    pub fn crd() -> Result<CustomResourceDefinition> {
        let crd = serde_json::json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "CustomResourceDefinition",
            "metadata": { "name": format!("{}.{}", DISK_PLURAL, DISK_GROUP) },
            "spec": {
                "group": DISK_GROUP,
                "names": {
                    "kind": DISK_KIND,
                    "listKind": format!("{}List", DISK_KIND),
                    "plural": DISK_PLURAL,
                    "singular": DISK_KIND.to_lowercase(),
                },
                "scope": "Cluster",
                "versions": [{
                    "name": DISK_VERSION,
                    "served": true,
                    "storage": true,
                    "schema": {
                        "openAPIV3Schema": {
                            "type": "object",
                            "properties": {
                                "spec": schema_of::<DiskSpec>()?,
                                "status": schema_of::<DiskStatus>()?,
                                "stats": schema_of::<DiskStats>()?,
                            },
                        },
                    },
                    "additionalPrinterColumns": [
                        {
                            "name": "Node",
                            "type": "string",
                            "jsonPath": format!(".metadata.labels.{}", HOSTNAME_LABEL.replace('.', "\\.")),
                        },
                        { "name": "Path", "type": "string", "jsonPath": ".spec.path" },
                        { "name": "State", "type": "string", "jsonPath": ".status.state" },
                    ],
                }],
            },
        });
        Ok(serde_json::from_value(crd)?)
    }
}

/// Structural (fully inlined) OpenAPI v3 schema of a resource section
fn schema_of<T: JsonSchema>() -> Result<serde_json::Value> {
    let gen = SchemaSettings::openapi3()
        .with(|settings| {
            settings.inline_subschemas = true;
            settings.meta_schema = None;
        })
        .into_generator();
    Ok(serde_json::to_value(gen.into_root_schema_for::<T>())?)
}

// =============================================================================
// Spec
// =============================================================================

/// Static description of a disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    /// Device path (e.g. /dev/sdb)
    #[serde(default)]
    pub path: String,

    /// Size and sector geometry
    #[serde(default)]
    pub capacity: DiskCapacity,

    /// Hardware identification
    #[serde(default)]
    pub details: DiskDetails,

    /// Soft links grouped by naming scheme
    #[serde(default)]
    pub devlinks: Vec<DiskDevLink>,

    /// Filesystem on the whole device
    #[serde(default, rename = "filesystem")]
    pub file_system: FileSystemInfoSpec,
}

/// Size and sector geometry of a disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskCapacity {
    /// Capacity in bytes
    #[serde(default)]
    pub storage: u64,

    /// Physical sector size in bytes
    #[serde(default)]
    pub physical_sector_size: u32,

    /// Logical sector size in bytes
    #[serde(default)]
    pub logical_sector_size: u32,
}

/// Hardware identification of a disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskDetails {
    /// 0 = not reported, 1 = solid state, otherwise RPM
    #[serde(default)]
    pub rotation_rate: u16,

    /// HDD, SSD or Unknown
    #[serde(default)]
    pub drive_type: String,

    #[serde(default)]
    pub model: String,

    /// Implemented standard, e.g. SPC-4
    #[serde(default)]
    pub compliance: String,

    #[serde(default)]
    pub serial: String,

    #[serde(default)]
    pub vendor: String,

    #[serde(default)]
    pub firmware_revision: String,
}

/// Soft links of one naming scheme
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskDevLink {
    /// `by-id` or `by-path`
    pub kind: String,

    pub links: Vec<String>,
}

/// Exported filesystem information.
///
/// Both fields are omitted when the device carries no filesystem, so "no
/// filesystem" stays distinguishable from a filesystem with an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemInfoSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
}

impl FileSystemInfoSpec {
    /// Check if a filesystem was reported
    pub fn is_present(&self) -> bool {
        self.fs_type.is_some()
    }
}

/// One partition of a disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    /// Partition type code (e.g. 83, 8e)
    #[serde(default)]
    pub partition_type: String,

    #[serde(default)]
    pub file_system: FileSystemInfoSpec,
}

// =============================================================================
// Status
// =============================================================================

/// Status of a Disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskStatus {
    #[serde(default)]
    pub state: DiskState,
}

/// Attachment state of a disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DiskState {
    /// Connected to the node
    #[default]
    Active,
    /// Disconnected from the node
    Inactive,
    /// Attachment cannot be determined
    Unknown,
}

impl std::fmt::Display for DiskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskState::Active => write!(f, "Active"),
            DiskState::Inactive => write!(f, "Inactive"),
            DiskState::Unknown => write!(f, "Unknown"),
        }
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Runtime counters of a disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskStats {
    /// Temperature readings, empty unless the reader reported valid data
    #[serde(default)]
    pub temperature: DiskTemperature,

    #[serde(default)]
    pub total_bytes_read: u64,

    #[serde(default)]
    pub total_bytes_written: u64,

    #[serde(default)]
    pub device_utilization_rate: f64,

    #[serde(default)]
    pub percent_endurance_used: f64,
}

/// Exported temperature readings in degrees Celsius
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskTemperature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_temperature: Option<i16>,

    /// Lifetime highest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_temperature: Option<i16>,

    /// Lifetime lowest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowest_temperature: Option<i16>,
}

impl DiskTemperature {
    /// Check if no reading is present
    pub fn is_empty(&self) -> bool {
        self.current_temperature.is_none()
            && self.highest_temperature.is_none()
            && self.lowest_temperature.is_none()
    }
}
