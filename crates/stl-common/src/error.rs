// ============================================
// File: crates/stl-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Provides foundational error types and result aliases used across
//! all STL crates, enabling consistent error handling.
//!
//! ## Main Functionality
//! - `CommonError`: Base error enum for common operations
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never include key material or plaintext in error messages
//! - `stl-node` wraps `CommonError` when it parses identities from files
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Common error types shared across STL crates.
///
/// # Example
/// ```
/// use stl_common::error::CommonError;
/// use stl_common::types::PeerId;
///
/// let result = "not base64!".parse::<PeerId>();
/// assert!(matches!(result, Err(CommonError::Decoding { .. })));
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    /// Failed to decode/deserialize data.
    #[error("Decoding error: {context}: {details}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Error details
        details: String,
    },
}

impl CommonError {
    /// Creates a `Decoding` error.
    pub fn decoding(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Decoding {
            context: context.into(),
            details: details.into(),
        }
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<base64::DecodeError> for CommonError {
    fn from(err: base64::DecodeError) -> Self {
        Self::decoding("base64 decode", err.to_string())
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
        let err = CommonError::decoding("peer id", "invalid padding");
        assert!(err.to_string().contains("peer id"));
        assert!(err.to_string().contains("invalid padding"));
    }

    #[test]
    fn test_base64_error_conversion() {
        let err: CommonError = base64::DecodeError::InvalidLength(3).into();
        assert!(matches!(err, CommonError::Decoding { .. }));
    }
}
