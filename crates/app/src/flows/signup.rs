//! Email/password sign-up.

use atelier_auth::{AuthError, Identity};
use atelier_core::validation::{PasswordIssue, check_password, is_valid_email};

use super::FlowError;
use crate::context::AppContext;
use crate::guard::InFlight;
use crate::navigation::Route;
use crate::notice::{Notice, Prompt};

pub const FILL_ALL: &str = "Please fill all the fields!";
pub const FILL_CORRECTLY: &str = "Please fill the fields correctly!";
pub const PASSWORD_MISMATCH: &str = "Password does not match!";
pub const EMAIL_IN_USE: &str = "The email is already in use!";
pub const EMAIL_IN_USE_DETAIL: &str = "Try another email for signup.";
pub const SIGNUP_FAILED: &str = "An error occurred! Please try again later.";
pub const VERIFICATION_FAILED: &str = "An error occurred! Please try again.";
pub const VERIFY_EMAIL: &str = "Verify Email!";
pub const VERIFY_EMAIL_MESSAGE: &str = "Email verification sent. Please check your email and verify.";

/// Inline field errors shown under the sign-up inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignupCheck {
    pub invalid_email: bool,
    pub password: Option<PasswordIssue>,
    pub confirmation_mismatch: bool,
}

impl SignupCheck {
    pub fn run(email: &str, password: &str, confirmation: &str) -> Self {
        Self {
            invalid_email: !email.is_empty() && !is_valid_email(email.trim()),
            password: if password.is_empty() {
                None
            } else {
                check_password(password).err()
            },
            confirmation_mismatch: !confirmation.is_empty() && confirmation != password,
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.invalid_email && self.password.is_none() && !self.confirmation_mismatch
    }

    pub fn password_message(&self) -> Option<&'static str> {
        self.password.map(PasswordIssue::message)
    }

    pub fn confirmation_message(&self) -> Option<&'static str> {
        self.confirmation_mismatch.then_some(PASSWORD_MISMATCH)
    }
}

pub struct SignupFlow {
    ctx: AppContext,
    in_flight: InFlight,
}

impl SignupFlow {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            in_flight: InFlight::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_busy()
    }

    /// Create the account and send the verification email.
    ///
    /// The new user is signed out again and sent to `Login`: an account only
    /// becomes usable once its email is verified.
    pub async fn submit(&self, email: &str, password: &str, confirmation: &str) -> Result<Identity, FlowError> {
        let _guard = self.in_flight.try_begin().ok_or(FlowError::Busy)?;

        if email.trim().is_empty() || password.is_empty() || confirmation.is_empty() {
            self.ctx.notify(Notice::error(FILL_ALL));
            return Err(FlowError::EmptyFields);
        }
        if !SignupCheck::run(email, password, confirmation).is_clean() {
            self.ctx.notify(Notice::error(FILL_CORRECTLY));
            return Err(FlowError::InvalidFields);
        }

        let identity = match self.ctx.identity.create_user_with_email(email.trim(), password).await {
            Ok(identity) => identity,
            Err(AuthError::EmailAlreadyInUse) => {
                tracing::info!("sign-up with an email already in use");
                self.ctx
                    .notify(Notice::error(EMAIL_IN_USE).with_detail(EMAIL_IN_USE_DETAIL));
                return Err(AuthError::EmailAlreadyInUse.into());
            }
            Err(error) => {
                tracing::error!(%error, "account creation failed");
                self.ctx.notify(Notice::error(SIGNUP_FAILED));
                return Err(error.into());
            }
        };
        tracing::info!(user_id = %identity.id, "account created");

        if let Err(error) = self.ctx.identity.send_email_verification().await {
            tracing::error!(user_id = %identity.id, %error, "verification email not sent");
            self.ctx.notify(Notice::error(VERIFICATION_FAILED));
            return Err(error.into());
        }

        if let Err(error) = self.ctx.identity.sign_out().await {
            tracing::warn!(user_id = %identity.id, %error, "sign-out after sign-up failed");
        }

        self.ctx.prompt(Prompt::new(VERIFY_EMAIL, VERIFY_EMAIL_MESSAGE));
        self.ctx.reset_to(Route::Login);
        Ok(identity)
    }
}
