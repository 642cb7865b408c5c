//! Identity provider interface consumed by the application.

use async_trait::async_trait;

use atelier_core::Subscription;

use crate::{AuthError, Identity, SessionEvent};

/// External identity service (sign-up, sign-in, sessions, account deletion).
///
/// Retry and consistency behaviour belong to the provider; callers treat every
/// failure as terminal for that attempt.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to session changes.
    ///
    /// The current session is delivered first, then one event per change,
    /// including sign-outs the client did not initiate (e.g. token revocation).
    fn on_session_change(&self) -> Subscription<SessionEvent>;

    /// Identity of the signed-in user, if any.
    fn current_identity(&self) -> Option<Identity>;

    /// Create an email/password account. The new user is signed in.
    async fn create_user_with_email(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Exchange an OAuth id token (from [`GoogleSignIn`]) for a session.
    async fn sign_in_with_google_credential(&self, id_token: &str) -> Result<Identity, AuthError>;

    /// Start phone sign-in by sending a one-time code to `phone_number`.
    async fn sign_in_with_phone(&self, phone_number: &str) -> Result<Box<dyn PhoneConfirmation>, AuthError>;

    /// Send a verification email to the signed-in user.
    async fn send_email_verification(&self) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Delete the signed-in user's account. Ends the session on success.
    async fn delete_current_account(&self) -> Result<(), AuthError>;
}

/// Pending phone sign-in, completed by entering the code that was sent.
#[async_trait]
pub trait PhoneConfirmation: Send + Sync {
    fn phone_number(&self) -> &str;

    async fn confirm(&self, code: &str) -> Result<Identity, AuthError>;
}

/// Account picked in the native Google sign-in sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleAccount {
    pub id_token: String,
    pub email: Option<String>,
}

/// Native Google sign-in step that precedes the credential exchange.
#[async_trait]
pub trait GoogleSignIn: Send + Sync {
    /// Fails when the device cannot run Google sign-in.
    async fn has_play_services(&self) -> Result<(), AuthError>;

    async fn sign_in(&self) -> Result<GoogleAccount, AuthError>;
}
