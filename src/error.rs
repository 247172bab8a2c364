//! Error types for the Node Disk Manager
//!
//! Projection of a disk is total and never produces an error. The variants
//! here cover identity correlation in the registry, loading recorded
//! observations, and handing exported resources to the control plane.

use thiserror::Error;

/// Unified error type for the disk manager
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Publishing disk {name} failed: {reason}")]
    PublishFailed { name: String, reason: String },

    // =========================================================================
    // Identity Correlation Errors
    // =========================================================================
    #[error("Disk not found: {uuid}")]
    DiskNotFound { uuid: String },

    #[error("No disk registered for {probe} key {key}")]
    SourceKeyNotFound { probe: String, key: String },

    #[error("Invalid disk identifier: {0}")]
    InvalidIdentifier(String),

    #[error("{probe} key {key} already belongs to disk {existing}, refusing to bind it to {requested}")]
    SourceKeyConflict {
        probe: String,
        key: String,
        existing: String,
        requested: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is transient and the operation may be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Kube(_) | Error::PublishFailed { .. })
    }

    /// Check if this error was raised by identity correlation
    pub fn is_identity_error(&self) -> bool {
        matches!(
            self,
            Error::DiskNotFound { .. }
                | Error::SourceKeyNotFound { .. }
                | Error::InvalidIdentifier(_)
                | Error::SourceKeyConflict { .. }
        )
    }
}

/// Result type alias for the disk manager
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = Error::PublishFailed {
            name: "disk-1".into(),
            reason: "conflict".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_identity_error());

        let err = Error::SourceKeyConflict {
            probe: "udev".into(),
            key: "/sys/block/sda".into(),
            existing: "disk-a".into(),
            requested: "disk-b".into(),
        };
        assert!(!err.is_transient());
        assert!(err.is_identity_error());
    }

    #[test]
    fn test_conflict_message() {
        let err = Error::SourceKeyConflict {
            probe: "smart".into(),
            key: "/dev/sda".into(),
            existing: "disk-a".into(),
            requested: "disk-b".into(),
        };
        assert_eq!(
            err.to_string(),
            "smart key /dev/sda already belongs to disk disk-a, refusing to bind it to disk-b"
        );
    }
}
