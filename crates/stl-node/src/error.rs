// ============================================
// File: crates/stl-node/src/error.rs
// ============================================
//! # Node Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial node error definitions

use std::path::Path;

use thiserror::Error;

use stl_common::error::CommonError;
use stl_core::error::CoreError;
use stl_transport::error::TransportError;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Node error types.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        path: String,
        reason: String,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        field: String,
        reason: String,
    },

    #[error("Certificate file '{path}': {reason}")]
    KeyFile {
        path: String,
        reason: String,
    },

    #[error("Server failed to start: {reason}")]
    StartupFailed {
        reason: String,
    },

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn key_file(path: &Path, reason: impl Into<String>) -> Self {
        Self::KeyFile {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    /// Returns `true` if a peer may be misbehaving rather than the
    /// network failing.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_suspicious(),
            Self::Core(err) => err.is_suspicious(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NodeError::config_load("/etc/stl/node.toml", "file not found");
        assert!(err.to_string().contains("/etc/stl/node.toml"));

        let err = NodeError::key_file(Path::new("client.json"), "missing private key");
        assert!(err.to_string().contains("client.json"));
    }

    #[test]
    fn test_error_classification() {
        assert!(NodeError::from(TransportError::Integrity { segment: 3 }).is_suspicious());
        assert!(!NodeError::config_invalid("network.listen_addr", "missing").is_suspicious());

        let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "idle");
        assert!(!NodeError::from(timeout).is_suspicious());
    }
}
