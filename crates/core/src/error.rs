//! Domain error model.

use thiserror::Error;

/// Domain-level error.
///
/// Only deterministic failures (malformed values and identifiers) live here.
/// The identity provider and the document store have their own error types
/// in the crates that wrap those services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. an unknown role name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was empty or not usable as a store key.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
