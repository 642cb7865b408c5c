//! `atelier-core` — domain building blocks for the artist directory.
//!
//! This crate contains **pure domain** primitives: identifiers, the profile
//! record and its validation rules, and the subscription handle used by every
//! realtime collaborator. No IO lives here.

pub mod error;
pub mod id;
pub mod profile;
pub mod subscription;
pub mod validation;

pub use error::DomainError;
pub use id::UserId;
pub use profile::{
    FieldError, FieldIssue, ProfileField, ProfileFields, ProfileRecord, Role, UserProfile,
    ValidationReport,
};
pub use subscription::{Fanout, Subscription};
