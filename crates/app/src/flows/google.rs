//! Google sign-in: native account picker, then credential exchange.

use std::sync::Arc;

use atelier_auth::{AuthError, GoogleSignIn, Identity};

use super::{FlowError, route_signed_in};
use crate::context::AppContext;
use crate::guard::InFlight;
use crate::navigation::Route;
use crate::notice::Notice;

pub const GOOGLE_FAILED: &str = "An error occurred!";
pub const GOOGLE_FAILED_DETAIL: &str = "Please try again.";

pub struct GoogleFlow {
    ctx: AppContext,
    google: Arc<dyn GoogleSignIn>,
    in_flight: InFlight,
}

impl GoogleFlow {
    pub fn new(ctx: AppContext, google: Arc<dyn GoogleSignIn>) -> Self {
        if ctx.config.google_web_client_id.is_none() {
            tracing::warn!("no Google web client id configured");
        }
        Self {
            ctx,
            google,
            in_flight: InFlight::new(),
        }
    }

    pub async fn sign_in(&self) -> Result<Route, FlowError> {
        let _guard = self.in_flight.try_begin().ok_or(FlowError::Busy)?;

        match self.exchange().await {
            Ok(identity) => Ok(route_signed_in(&self.ctx, &identity).await),
            Err(error) => {
                tracing::warn!(%error, "Google sign-in failed");
                self.ctx
                    .notify(Notice::error(GOOGLE_FAILED).with_detail(GOOGLE_FAILED_DETAIL));
                Err(error.into())
            }
        }
    }

    async fn exchange(&self) -> Result<Identity, AuthError> {
        self.google.has_play_services().await?;
        let account = self.google.sign_in().await?;
        self.ctx
            .identity
            .sign_in_with_google_credential(&account.id_token)
            .await
    }
}
