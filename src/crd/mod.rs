//! Custom Resource Definitions
//!
//! This module contains the exported resource types:
//! - Disk: one physical block device attached to a cluster node
//! - Partition: a partition entry of a Disk

pub mod disk;

pub use disk::*;
