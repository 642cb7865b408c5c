//! `atelier-auth` — identity provider boundary.
//!
//! The identity provider (sign-up, sign-in, sessions, account deletion) is an
//! external service. This crate defines the narrow interface the application
//! consumes, the coarse error taxonomy surfaced to users, and an in-memory
//! provider for tests and local development.
//!
//! This crate is intentionally decoupled from storage and presentation.

pub mod authorize;
pub mod error;
pub mod identity;
pub mod in_memory;
pub mod provider;

pub use authorize::{AuthzError, require_role};
pub use error::AuthError;
pub use identity::{Identity, SessionEvent};
pub use in_memory::{AuthOp, InMemoryGoogleSignIn, InMemoryIdentityProvider};
pub use provider::{GoogleAccount, GoogleSignIn, IdentityProvider, PhoneConfirmation};
