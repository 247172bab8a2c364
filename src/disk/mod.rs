//! Disk Module
//!
//! The per-device aggregate that observation sources populate, the
//! identifiers correlating those sources, and the projection of the
//! aggregate into the exported Disk resource.

pub mod identifiers;
pub mod info;
pub mod observation;
pub mod projection;

pub use identifiers::*;
pub use info::*;
pub use observation::*;
