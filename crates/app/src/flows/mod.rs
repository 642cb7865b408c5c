//! Sign-up and sign-in screens.
//!
//! Each flow validates its input locally, makes one provider call per user
//! intent and reports every failure as a notice (or a prompt) before
//! returning it. Flows that end signed in route through the profile lookup,
//! the same way session resolution does.

pub mod google;
pub mod landing;
pub mod login;
pub mod phone;
pub mod signup;

pub use google::GoogleFlow;
pub use landing::Landing;
pub use login::LoginFlow;
pub use phone::PhoneFlow;
pub use signup::{SignupCheck, SignupFlow};

use thiserror::Error;

use atelier_auth::{AuthError, Identity};
use atelier_infra::StoreError;

use crate::context::AppContext;
use crate::navigation::Route;
use crate::notice::Notice;
use crate::session::{PROFILE_READ_FAILED, lookup_destination};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("another attempt is still running")]
    Busy,

    #[error("required fields are empty")]
    EmptyFields,

    #[error("fields are not filled in correctly")]
    InvalidFields,

    #[error("email address is not verified")]
    EmailNotVerified,

    #[error("no verification code has been requested")]
    NoPendingVerification,

    #[error("verification code is incomplete")]
    IncompleteCode,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Send a freshly signed-in user to their start screen.
///
/// A failed profile read falls back to `Home` with an error notice.
pub(crate) async fn route_signed_in(ctx: &AppContext, identity: &Identity) -> Route {
    let route = match lookup_destination(&ctx.profiles, &identity.id).await {
        Ok(route) => route,
        Err(error) => {
            tracing::warn!(user_id = %identity.id, %error, "profile lookup after sign-in failed");
            ctx.notify(Notice::error(PROFILE_READ_FAILED));
            Route::Home
        }
    };
    tracing::info!(user_id = %identity.id, %route, "signed in");
    ctx.reset_to(route);
    route
}
