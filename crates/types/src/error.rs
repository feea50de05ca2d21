//! Error taxonomy for calibration lookups.

use thiserror::Error;

/// Errors surfaced by the caldb client and its providers.
///
/// "Dataset not found" is deliberately absent: providers report it as
/// `Ok(None)` so that callers can distinguish an empty answer from a
/// broken one.
#[derive(Debug, Error)]
pub enum CaldbError {
    /// Structurally malformed namepath (bad run number, bad time token,
    /// too many segments).
    #[error("Request parse error: {message}")]
    Parse { message: String },

    /// The client cannot reach a usable connection: reconnect was asked
    /// for without a stored connection string, or auto-reconnect is off
    /// while disconnected.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The backend answered with data that violates its contract, e.g. a
    /// found dataset with zero rows, or a 2-D table where a single-row
    /// shape was requested.
    #[error("Contract violation: {message}")]
    ContractViolation { message: String },

    /// A cell failed strict numeric parsing while a numeric shape was
    /// being produced.
    #[error("Conversion error: column '{column}' value '{value}' is not a valid {target}")]
    Conversion {
        column: String,
        value: String,
        target: &'static str,
    },

    /// Backend-side failure: I/O, HTTP, malformed payloads.
    #[error("Provider error: {message}")]
    Provider { message: String },
}

impl CaldbError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation { message: message.into() }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider { message: message.into() }
    }
}
