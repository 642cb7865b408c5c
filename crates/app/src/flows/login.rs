//! Email/password sign-in.

use atelier_auth::AuthError;

use super::{FlowError, route_signed_in};
use crate::context::AppContext;
use crate::guard::InFlight;
use crate::navigation::Route;
use crate::notice::Notice;

pub const EMPTY_FIELDS: &str = "Empty fields";
pub const EMPTY_FIELDS_DETAIL: &str = "Please enter email/password to login.";
pub const NOT_VERIFIED: &str = "Email not verified!";
pub const NOT_VERIFIED_DETAIL: &str = "Please check your email and verify.";

/// User-facing text for a failed email sign-in.
pub fn sign_in_failure_message(error: &AuthError) -> &'static str {
    match error {
        AuthError::UserNotFound => "No user found with this email.",
        AuthError::WrongPassword => "Incorrect password.",
        AuthError::InvalidEmail => "Invalid email format. Please enter a valid email address.",
        AuthError::InvalidCredential => "Invalid credentials!",
        _ => "An error occurred! Please try after sometime.",
    }
}

pub struct LoginFlow {
    ctx: AppContext,
    in_flight: InFlight,
}

impl LoginFlow {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            in_flight: InFlight::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_busy()
    }

    /// Sign in and open the user's start screen.
    ///
    /// An unverified account gets a fresh verification email and is signed
    /// out again.
    pub async fn submit(&self, email: &str, password: &str) -> Result<Route, FlowError> {
        let _guard = self.in_flight.try_begin().ok_or(FlowError::Busy)?;

        if email.trim().is_empty() || password.is_empty() {
            self.ctx
                .notify(Notice::error(EMPTY_FIELDS).with_detail(EMPTY_FIELDS_DETAIL));
            return Err(FlowError::EmptyFields);
        }

        let identity = match self.ctx.identity.sign_in_with_email(email.trim(), password).await {
            Ok(identity) => identity,
            Err(error) => {
                tracing::info!(code = error.code(), "email sign-in rejected");
                self.ctx.notify(Notice::error(sign_in_failure_message(&error)));
                return Err(error.into());
            }
        };

        if !identity.email_verified {
            tracing::info!(user_id = %identity.id, "sign-in with unverified email");
            if let Err(error) = self.ctx.identity.send_email_verification().await {
                tracing::warn!(user_id = %identity.id, %error, "verification email not resent");
            }
            self.ctx
                .notify(Notice::error(NOT_VERIFIED).with_detail(NOT_VERIFIED_DETAIL));
            if let Err(error) = self.ctx.identity.sign_out().await {
                tracing::warn!(user_id = %identity.id, %error, "sign-out of unverified account failed");
            }
            return Err(FlowError::EmailNotVerified);
        }

        Ok(route_signed_in(&self.ctx, &identity).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_errors_get_specific_messages() {
        assert_eq!(sign_in_failure_message(&AuthError::WrongPassword), "Incorrect password.");
        assert_eq!(
            sign_in_failure_message(&AuthError::from_code("auth/user-not-found")),
            "No user found with this email."
        );
        assert_eq!(
            sign_in_failure_message(&AuthError::from_code("auth/too-many-requests")),
            "An error occurred! Please try after sometime."
        );
    }
}
