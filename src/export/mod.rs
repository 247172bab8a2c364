//! Export Module
//!
//! Moves exported Disk resources out of the process:
//! - Loader: replays recorded probe observations into a registry
//! - Output: renders disks as YAML or JSON
//! - Publisher: adapters for the control-plane store
//! - Exporter: follows registry events and publishes changes

pub mod exporter;
pub mod loader;
pub mod output;
pub mod publisher;

pub use exporter::Exporter;
pub use loader::{load_observations, replay, replay_file, ObservationRecord, ReplaySummary};
pub use output::render;
pub use publisher::{KubePublisher, KubePublisherConfig, MemoryPublisher};
