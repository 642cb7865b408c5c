//! Phone number sign-in with a one-time code.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use atelier_auth::{AuthError, PhoneConfirmation};
use atelier_core::validation::is_complete_otp;

use super::{FlowError, route_signed_in};
use crate::context::AppContext;
use crate::guard::InFlight;
use crate::navigation::{PhoneMode, Route};
use crate::notice::{Notice, Prompt};

pub const ENTER_NUMBER: &str = "Enter a phone number!";
pub const INVALID_NUMBER: &str = "Invalid Phone Number!";
pub const INVALID_CODE: &str = "Invalid Code!";
pub const SIGNED_IN: &str = "You signed in successfully!";
pub const UNEXPECTED: &str = "An unexpected error occurred!";
pub const UNEXPECTED_DETAIL: &str = "Please try after some time.";

#[derive(Default)]
struct PhoneState {
    confirmation: Option<Arc<dyn PhoneConfirmation>>,
    code: String,
}

/// Two steps: send a code to the number, then verify the code.
pub struct PhoneFlow {
    ctx: AppContext,
    mode: PhoneMode,
    state: Mutex<PhoneState>,
    in_flight: InFlight,
}

impl PhoneFlow {
    pub fn new(ctx: AppContext, mode: PhoneMode) -> Self {
        Self {
            ctx,
            mode,
            state: Mutex::new(PhoneState::default()),
            in_flight: InFlight::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PhoneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> PhoneMode {
        self.mode
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_busy()
    }

    /// Whether the code entry step is showing.
    pub fn awaiting_code(&self) -> bool {
        self.lock().confirmation.is_some()
    }

    pub fn set_code(&self, code: impl Into<String>) {
        self.lock().code = code.into();
    }

    /// Verify is enabled once a full-length code has been entered.
    pub fn can_verify(&self) -> bool {
        let state = self.lock();
        state.confirmation.is_some() && is_complete_otp(&state.code, self.ctx.config.otp_length)
    }

    /// Ask the provider to text a code to `phone_number` (international format).
    pub async fn send_code(&self, phone_number: &str) -> Result<(), FlowError> {
        let _guard = self.in_flight.try_begin().ok_or(FlowError::Busy)?;

        let phone_number = phone_number.trim();
        if phone_number.is_empty() {
            self.ctx.notify(Notice::error(ENTER_NUMBER));
            return Err(FlowError::EmptyFields);
        }

        match self.ctx.identity.sign_in_with_phone(phone_number).await {
            Ok(confirmation) => {
                tracing::info!(mode = self.mode.label(), "verification code sent");
                let mut state = self.lock();
                state.confirmation = Some(Arc::from(confirmation));
                state.code.clear();
                Ok(())
            }
            Err(AuthError::InvalidPhoneNumber) => {
                let action = self.mode.label().to_lowercase();
                self.ctx.prompt(Prompt::new(
                    INVALID_NUMBER,
                    format!("Enter a valid phone number to {action}."),
                ));
                Err(AuthError::InvalidPhoneNumber.into())
            }
            Err(error) => {
                tracing::error!(%error, "phone sign-in could not start");
                self.ctx
                    .notify(Notice::error(UNEXPECTED).with_detail(UNEXPECTED_DETAIL));
                Err(error.into())
            }
        }
    }

    /// Confirm the entered code and open the user's start screen.
    pub async fn verify(&self) -> Result<Route, FlowError> {
        let _guard = self.in_flight.try_begin().ok_or(FlowError::Busy)?;

        let (confirmation, code) = {
            let state = self.lock();
            let confirmation = state
                .confirmation
                .clone()
                .ok_or(FlowError::NoPendingVerification)?;
            if !is_complete_otp(&state.code, self.ctx.config.otp_length) {
                return Err(FlowError::IncompleteCode);
            }
            (confirmation, state.code.clone())
        };

        match confirmation.confirm(&code).await {
            Ok(identity) => {
                self.lock().confirmation = None;
                self.ctx.notify(Notice::success(SIGNED_IN));
                Ok(route_signed_in(&self.ctx, &identity).await)
            }
            Err(AuthError::InvalidVerificationCode) => {
                tracing::info!("wrong verification code entered");
                self.ctx.notify(Notice::error(INVALID_CODE));
                Err(AuthError::InvalidVerificationCode.into())
            }
            Err(error) => {
                tracing::error!(%error, "code confirmation failed");
                self.ctx.notify(Notice::error(UNEXPECTED));
                Err(error.into())
            }
        }
    }
}
