//! Role checks at the view boundary.
//!
//! These are client-side routing checks only. The document store's own rules
//! remain the authority on who may read what.

use thiserror::Error;

use atelier_core::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{required}' required")]
    Forbidden { required: Role, actual: Option<Role> },
}

/// Require the viewer to hold `required`.
///
/// - No IO
/// - No panics
pub fn require_role(actual: Option<Role>, required: Role) -> Result<(), AuthzError> {
    if actual == Some(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { required, actual })
    }
}
