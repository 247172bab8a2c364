//! Disk Registry Module
//!
//! Identity correlation for the disks of one node: maps every source key to
//! a single aggregate and serializes the writes of concurrent observers.

pub mod disk_registry;
pub mod events;

pub use disk_registry::*;
pub use events::*;
