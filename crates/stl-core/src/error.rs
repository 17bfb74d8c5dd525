// ============================================
// File: crates/stl-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines error types specific to certificates, key material, the
//! handshake protocol and the wire codec.
//!
//! ## Error Categories
//! 1. **Validation Errors**: Malformed certificates or configuration
//! 2. **Crypto Errors**: Key generation, signing, key exchange, encryption
//! 3. **Protocol Errors**: Message decoding, version mismatch
//! 4. **Handshake Errors**: Protocol mismatch during session establishment
//! 5. **State Errors**: Invalid operation order
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - All errors should be loggable without leaking secrets
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for certificate, handshake and codec operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Validation Errors
    // ========================================

    /// Certificate or configuration failed validation.
    #[error("Validation failed for '{field}': {reason}")]
    Validation {
        /// Which field is invalid
        field: String,
        /// What's wrong with it
        reason: String,
    },

    // ========================================
    // Cryptographic Errors
    // ========================================

    /// Failed to generate cryptographic key.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What key was being generated
        context: String,
    },

    /// Public key bytes are not a valid point on the curve.
    #[error("Invalid public key: {reason}")]
    InvalidPublicKey {
        /// Why the key was rejected
        reason: String,
    },

    /// Signature verification failed.
    #[error("Signature verification failed")]
    SignatureVerification,

    /// Key exchange operation failed.
    #[error("Key exchange failed: {reason}")]
    KeyExchange {
        /// Why key exchange failed
        reason: String,
    },

    /// Key derivation failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivation {
        /// Why derivation failed
        reason: String,
    },

    /// Encryption operation failed.
    #[error("Encryption failed: {context}")]
    Encryption {
        /// What was being encrypted
        context: String,
    },

    // ========================================
    // Protocol Errors
    // ========================================

    /// Unknown or unsupported message type.
    #[error("Unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),

    /// Protocol version mismatch.
    #[error("Unsupported protocol version: {got}, expected {expected}")]
    UnsupportedVersion {
        /// Version received
        got: u8,
        /// Version expected
        expected: u8,
    },

    /// Message is malformed.
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// What's wrong with the message
        reason: String,
    },

    /// Message is too short to be valid.
    #[error("Message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    // ========================================
    // Handshake Errors
    // ========================================

    /// Handshake message is inconsistent with the expected peer.
    #[error("Handshake failed: {reason}")]
    Handshake {
        /// What didn't match
        reason: String,
    },

    // ========================================
    // State Errors
    // ========================================

    /// Operation not valid in current state.
    #[error("Invalid state for operation: {operation} requires {required_state}")]
    InvalidState {
        /// What operation was attempted
        operation: String,
        /// What state was required
        required_state: String,
    },
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `Validation` error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates an `InvalidPublicKey` error.
    pub fn invalid_public_key(reason: impl Into<String>) -> Self {
        Self::InvalidPublicKey {
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedMessage` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Creates a `MessageTooShort` error.
    #[must_use]
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Creates a `Handshake` error.
    pub fn handshake(reason: impl Into<String>) -> Self {
        Self::Handshake {
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidState` error.
    pub fn invalid_state(
        operation: impl Into<String>,
        required_state: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            required_state: required_state.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error might indicate an attack.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(self, Self::SignatureVerification | Self::Handshake { .. })
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
        let err = CoreError::too_short(100, 50);
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));

        let err = CoreError::validation("id", "missing ID field");
        assert!(err.to_string().contains("missing ID field"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::SignatureVerification.is_suspicious());
        assert!(CoreError::handshake("transcript mismatch").is_suspicious());
        assert!(!CoreError::UnknownMessageType(0xFF).is_suspicious());
        assert!(!CoreError::validation("id", "empty").is_suspicious());
    }
}
