// ============================================
// File: crates/stl-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for the secure stream: byte stream failures,
//! framing violations, handshake failures and segment integrity errors.
//!
//! ## Main Functionality
//! - `Stage`: Where in the connection lifecycle an error happened
//! - `TransportError`: Primary error enum for `Conn` operations
//! - Conversion into `std::io::Error` for the `Read`/`Write` impls
//!
//! ## Error Categories
//! 1. **Stream Errors**: I/O failures, oversized frames
//! 2. **Handshake Errors**: Decode failures, verification failures, rejection
//! 3. **Data Errors**: Integrity failures, crypto failures, counter exhaustion
//! 4. **State Errors**: Not established, previously failed
//! 5. **Configuration Errors**: Invalid client/server configuration
//!
//! ## ⚠️ Important Note for Next Developer
//! - Nothing here is retryable: every data-path error is terminal for
//!   the connection
//! - Never include plaintext or key material in error messages
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::fmt;
use std::io;

use thiserror::Error;

use stl_common::types::PeerId;
use stl_core::error::CoreError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// Stage
// ============================================

/// Point in the connection lifecycle at which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Sending or receiving the handshake request.
    HandshakeRequest,
    /// Sending or receiving the handshake response.
    HandshakeResponse,
    /// Reading the segment with the given counter.
    ReadSegment(u64),
    /// Writing the segment with the given counter.
    WriteSegment(u64),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandshakeRequest => write!(f, "handshake request"),
            Self::HandshakeResponse => write!(f, "handshake response"),
            Self::ReadSegment(n) => write!(f, "read segment {n}"),
            Self::WriteSegment(n) => write!(f, "write segment {n}"),
        }
    }
}

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Stream Errors
    // ========================================

    /// Underlying byte stream failed.
    #[error("I/O error during {stage}")]
    Io {
        /// Where it happened
        stage: Stage,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Frame length exceeds the allowed maximum.
    #[error("Frame too large during {stage}: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Where it happened
        stage: Stage,
        /// Declared or requested frame size
        size: u64,
        /// Maximum allowed size
        max: usize,
    },

    /// Frame payload is not a valid message.
    #[error("Failed to decode {stage}")]
    Decode {
        /// Where it happened
        stage: Stage,
        /// Codec error
        #[source]
        source: CoreError,
    },

    // ========================================
    // Handshake Errors
    // ========================================

    /// Handshake could not be completed.
    #[error("Handshake failed during {stage}")]
    Handshake {
        /// Where it happened
        stage: Stage,
        /// Why the handshake failed
        #[source]
        source: CoreError,
    },

    /// Session verifier refused the client.
    #[error("Session rejected for client {client_id}")]
    Rejected {
        /// Identity the client presented
        client_id: PeerId,
    },

    // ========================================
    // Data Errors
    // ========================================

    /// Segment failed authentication.
    ///
    /// Covers tampering, truncation, reordering, duplication and drops.
    #[error("Integrity check failed for segment {segment}")]
    Integrity {
        /// Counter of the rejected segment
        segment: u64,
    },

    /// Signcryption engine reported a local failure.
    #[error("Crypto failure during {stage}")]
    Crypto {
        /// Where it happened
        stage: Stage,
        /// Engine error
        #[source]
        source: CoreError,
    },

    /// Segment counter would wrap.
    #[error("Segment counter exhausted ({direction})")]
    CounterExhausted {
        /// `"read"` or `"write"`
        direction: &'static str,
    },

    // ========================================
    // State Errors
    // ========================================

    /// Data operation attempted before the handshake completed.
    #[error("Connection not established")]
    NotEstablished,

    /// Connection failed earlier and cannot be used.
    #[error("Connection has failed")]
    Failed,

    // ========================================
    // Configuration Errors
    // ========================================

    /// Invalid configuration.
    #[error("Invalid configuration: {field} - {reason}")]
    Config {
        /// Configuration field name
        field: String,
        /// Why it's invalid
        reason: String,
    },
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `Io` error.
    #[must_use]
    pub const fn io(stage: Stage, source: io::Error) -> Self {
        Self::Io { stage, source }
    }

    /// Creates a `Handshake` error.
    #[must_use]
    pub const fn handshake(stage: Stage, source: CoreError) -> Self {
        Self::Handshake { stage, source }
    }

    /// Creates a `Config` error.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if the connection cannot be used after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::NotEstablished | Self::Config { .. })
    }

    /// Returns `true` if a segment failed authentication.
    #[must_use]
    pub const fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }

    /// Returns `true` if this error might indicate an attack rather than
    /// a network fault.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        match self {
            Self::Integrity { .. } | Self::Rejected { .. } => true,
            Self::Handshake { source, .. } => source.is_suspicious(),
            _ => false,
        }
    }

    /// Returns the stage the error is attributed to, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Io { stage, .. }
            | Self::FrameTooLarge { stage, .. }
            | Self::Decode { stage, .. }
            | Self::Handshake { stage, .. }
            | Self::Crypto { stage, .. } => Some(*stage),
            Self::Integrity { segment } => Some(Stage::ReadSegment(*segment)),
            _ => None,
        }
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Io { source, .. } => source.kind(),
            TransportError::FrameTooLarge { .. }
            | TransportError::Decode { .. }
            | TransportError::Integrity { .. }
            | TransportError::Crypto { .. }
            | TransportError::Handshake { .. } => io::ErrorKind::InvalidData,
            TransportError::Rejected { .. } => io::ErrorKind::PermissionDenied,
            TransportError::NotEstablished => io::ErrorKind::NotConnected,
            TransportError::Config { .. } => io::ErrorKind::InvalidInput,
            TransportError::Failed | TransportError::CounterExhausted { .. } => {
                io::ErrorKind::Other
            }
        };
        Self::new(kind, err)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Integrity { segment: 7 };
        assert!(err.to_string().contains('7'));

        let err = TransportError::io(
            Stage::WriteSegment(3),
            io::Error::new(io::ErrorKind::BrokenPipe, "pipe"),
        );
        assert!(err.to_string().contains("write segment 3"));
    }

    #[test]
    fn test_error_classification() {
        assert!(TransportError::Integrity { segment: 0 }.is_integrity_failure());
        assert!(TransportError::Integrity { segment: 0 }.is_fatal());
        assert!(TransportError::Failed.is_fatal());
        assert!(!TransportError::NotEstablished.is_fatal());
        assert!(!TransportError::config("server_id", "empty").is_fatal());
    }

    #[test]
    fn test_suspicious_errors() {
        assert!(TransportError::Integrity { segment: 0 }.is_suspicious());
        assert!(TransportError::Rejected {
            client_id: PeerId::from("mallory")
        }
        .is_suspicious());
        assert!(
            TransportError::handshake(Stage::HandshakeRequest, CoreError::SignatureVerification)
                .is_suspicious()
        );
        assert!(!TransportError::handshake(
            Stage::HandshakeResponse,
            CoreError::malformed("truncated")
        )
        .is_suspicious());

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(!TransportError::io(Stage::ReadSegment(0), reset).is_suspicious());
    }

    #[test]
    fn test_stage_attribution() {
        assert_eq!(
            TransportError::Integrity { segment: 2 }.stage(),
            Some(Stage::ReadSegment(2))
        );
        assert_eq!(TransportError::Failed.stage(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let err: io::Error = TransportError::Integrity { segment: 1 }.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let inner = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err: io::Error = TransportError::io(Stage::ReadSegment(0), inner).into();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }
}
