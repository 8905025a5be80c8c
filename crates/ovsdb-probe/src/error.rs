//! Error types for the OVSDB probe.
//!
//! Steady-state conditions of the reconciliation engine (incomplete rows,
//! references to rows not seen yet) are not errors and never show up here.
//! These variants cover the plumbing around it: configuration, addressing,
//! notification decoding and the monitor lifecycle.

use std::io;
use thiserror::Error;

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors that can occur outside of the steady-state notification path.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Configuration file could not be parsed or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// OVSDB address is neither `unix://`, `tcp://` nor `addr:port`.
    #[error("Invalid OVSDB address '{address}': {reason}")]
    InvalidAddress {
        /// The configured address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A table-updates document could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Monitor lifecycle misuse (e.g. starting twice).
    #[error("Monitor error: {0}")]
    Monitor(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ProbeError {
    /// Creates an invalid address error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}
