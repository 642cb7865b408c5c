//! Profile screen: view, edit, save, delete and logout for the signed-in user.
//!
//! The controller is shared with the UI (`&self` everywhere). Field state lives
//! behind a short-lived lock that is never held across an external call;
//! mutations against external services are serialized by an [`InFlight`] flag.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use atelier_auth::{AuthError, Identity};
use atelier_core::validation::local_phone_from_verified;
use atelier_core::{
    FieldError, FieldIssue, ProfileField, ProfileFields, Role, UserId, UserProfile, ValidationReport,
};
use atelier_infra::{DeletionReport, DeletionState, StoreError};

use crate::context::AppContext;
use crate::guard::InFlight;
use crate::navigation::Route;
use crate::notice::Notice;

pub const SAVED: &str = "Profile saved successfully!";
pub const SAVE_FAILED: &str = "Error saving data!";
pub const DELETED: &str = "Your profile has been deleted!";
pub const DELETE_FAILED: &str = "Error deleting profile!";
pub const LOGOUT_FAILED: &str = "Error logging out!";
pub const LOAD_FAILED: &str = "An unexpected error occurred!";
pub const INVALID_PHONE: &str = "Enter a valid phone number";

/// Genders offered by the form's picker.
pub const GENDER_CHOICES: [&str; 2] = ["Male", "Female"];

/// Destructive actions that need a yes/no dialog first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confirmation {
    Logout,
    DeleteProfile,
}

impl Confirmation {
    pub fn title(&self) -> &'static str {
        match self {
            Confirmation::Logout => "Logout?",
            Confirmation::DeleteProfile => "Delete Profile?",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Confirmation::Logout => "Are you sure you want to logout?",
            Confirmation::DeleteProfile => "Are you sure you want to delete your profile?",
        }
    }

    pub fn confirm_label(&self) -> &'static str {
        "Yes"
    }

    pub fn cancel_label(&self) -> &'static str {
        "No"
    }
}

/// Toast text for a rejected save. The inline hint under the phone input is
/// worded differently.
fn save_notice(error: &FieldError) -> &'static str {
    match error.issue {
        FieldIssue::InvalidPhone => INVALID_PHONE,
        _ => error.message(),
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("another action is still running")]
    Busy,

    #[error("no profile loaded")]
    NotLoaded,

    #[error("the form is not in edit mode")]
    NotEditing,

    #[error("profile has {} invalid field(s)", .0.errors().count())]
    Invalid(ValidationReport),

    #[error("no confirmation pending")]
    NothingToConfirm,

    #[error("account deletion stopped in state {0:?}")]
    Deletion(DeletionState),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Default)]
struct FormState {
    identity: Option<Identity>,
    fields: ProfileFields,
    committed: ProfileFields,
    edit_mode: bool,
    pending: Option<Confirmation>,
}

impl FormState {
    fn user_id(&self) -> Result<UserId, FormError> {
        self.identity
            .as_ref()
            .map(|i| i.id.clone())
            .ok_or(FormError::NotLoaded)
    }
}

pub struct ProfileFormController {
    ctx: AppContext,
    state: Mutex<FormState>,
    in_flight: InFlight,
}

impl ProfileFormController {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(FormState::default()),
            in_flight: InFlight::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        // Form state stays consistent field by field, so a poisoned lock is
        // still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read side
    // ─────────────────────────────────────────────────────────────────────

    pub fn fields(&self) -> ProfileFields {
        self.lock().fields.clone()
    }

    pub fn committed(&self) -> ProfileFields {
        self.lock().committed.clone()
    }

    pub fn edit_mode(&self) -> bool {
        self.lock().edit_mode
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_busy()
    }

    pub fn pending_confirmation(&self) -> Option<Confirmation> {
        self.lock().pending
    }

    pub fn role_choices(&self) -> [Role; 2] {
        Role::self_selectable()
    }

    /// Field-level problems with the current values. Pure.
    pub fn validate(&self) -> ValidationReport {
        let state = self.lock();
        state.fields.validate_edit(&state.committed)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Loading and editing
    // ─────────────────────────────────────────────────────────────────────

    /// Read the user's record once and populate the form.
    ///
    /// Without a record the form opens in edit mode (onboarding), with the
    /// phone prefilled from a verified phone sign-in. A failed read also
    /// opens the form in edit mode so the user can still save.
    pub async fn load_profile(&self, identity: &Identity) -> Result<(), FormError> {
        let loaded = self.ctx.profiles.load(&identity.id).await;

        let mut state = self.lock();
        state.identity = Some(identity.clone());
        state.pending = None;

        match loaded {
            Ok(Some(profile)) => {
                tracing::debug!(user_id = %identity.id, "profile loaded");
                let fields = ProfileFields::from(profile);
                state.committed = fields.clone();
                state.fields = fields;
                state.edit_mode = false;
                Ok(())
            }
            Ok(None) => {
                tracing::info!(user_id = %identity.id, "no profile yet; onboarding");
                let mut fields = ProfileFields::default();
                if let Some(number) = identity.phone_number.as_deref() {
                    fields.phone = local_phone_from_verified(number);
                }
                state.committed = fields.clone();
                state.fields = fields;
                state.edit_mode = true;
                Ok(())
            }
            Err(error) => {
                tracing::error!(user_id = %identity.id, %error, "profile load failed");
                state.edit_mode = true;
                drop(state);
                self.ctx.notify(Notice::error(LOAD_FAILED));
                Err(error.into())
            }
        }
    }

    pub fn begin_edit(&self) -> Result<(), FormError> {
        if self.in_flight.is_busy() {
            return Err(FormError::Busy);
        }
        let mut state = self.lock();
        if state.identity.is_none() {
            return Err(FormError::NotLoaded);
        }
        state.edit_mode = true;
        Ok(())
    }

    /// Leave edit mode, discarding unsaved values.
    pub fn cancel_edit(&self) -> Result<(), FormError> {
        if self.in_flight.is_busy() {
            return Err(FormError::Busy);
        }
        let mut state = self.lock();
        state.fields = state.committed.clone();
        state.edit_mode = false;
        Ok(())
    }

    pub fn set_field(&self, field: ProfileField, value: impl Into<String>) -> Result<(), FormError> {
        if self.in_flight.is_busy() {
            return Err(FormError::Busy);
        }
        let mut state = self.lock();
        if !state.edit_mode {
            return Err(FormError::NotEditing);
        }
        state.fields.set(field, value);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Write the five fields to the user's record (merging).
    pub async fn save(&self) -> Result<(), FormError> {
        let _guard = self.in_flight.try_begin().ok_or(FormError::Busy)?;
        let (user_id, fields, report) = {
            let state = self.lock();
            let report = state.fields.validate_edit(&state.committed);
            (state.user_id()?, state.fields.clone(), report)
        };

        if !report.is_valid() {
            // Missing fields are reported before format problems.
            let message = report
                .errors()
                .find(|e| e.issue == FieldIssue::Required)
                .or_else(|| report.errors().next())
                .map(save_notice)
                .unwrap_or(SAVE_FAILED);
            self.ctx.notify(Notice::error(message));
            return Err(FormError::Invalid(report));
        }

        let profile = UserProfile::from(fields.clone());
        match self.ctx.profiles.save(&user_id, &profile).await {
            Ok(()) => {
                tracing::info!(user_id = %user_id, "profile saved");
                {
                    let mut state = self.lock();
                    state.committed = fields;
                    state.edit_mode = false;
                }
                self.ctx.notify(Notice::success(SAVED));
                Ok(())
            }
            Err(error) => {
                tracing::error!(user_id = %user_id, %error, "profile save failed");
                self.ctx.notify(Notice::error(SAVE_FAILED));
                Err(error.into())
            }
        }
    }

    /// Delete the profile record and the account, then return to the landing
    /// screen.
    ///
    /// The user lands on `Landing` whenever the record was touched, even if
    /// the account step failed; only a deletion that changed nothing keeps
    /// the user here.
    pub async fn delete(&self) -> Result<DeletionReport, FormError> {
        let _guard = self.in_flight.try_begin().ok_or(FormError::Busy)?;
        let user_id = {
            let mut state = self.lock();
            state.pending = None;
            state.user_id()?
        };

        let report = self.ctx.deletion_saga().run(&user_id).await;

        match report.state {
            DeletionState::Failed => {}
            DeletionState::Completed => self.ctx.reset_to(Route::Landing),
            _ => {
                // The account outlived the deletion; end its session anyway.
                if let Err(error) = self.ctx.identity.sign_out().await {
                    tracing::warn!(user_id = %user_id, %error, "sign-out after incomplete deletion failed");
                }
                self.ctx.reset_to(Route::Landing);
            }
        }

        if report.is_complete() {
            *self.lock() = FormState::default();
            self.ctx.notify(Notice::info(DELETED));
            Ok(report)
        } else {
            tracing::warn!(user_id = %user_id, state = ?report.state, "profile deletion incomplete");
            self.ctx.notify(Notice::error(DELETE_FAILED));
            Err(FormError::Deletion(report.state))
        }
    }

    /// Sign out. Navigation happens only once the provider confirms.
    pub async fn logout(&self) -> Result<(), FormError> {
        let _guard = self.in_flight.try_begin().ok_or(FormError::Busy)?;
        self.lock().pending = None;

        match self.ctx.identity.sign_out().await {
            Ok(()) => {
                tracing::info!("signed out");
                *self.lock() = FormState::default();
                self.ctx.reset_to(Route::Landing);
                Ok(())
            }
            Err(error) => {
                tracing::error!(%error, "sign-out failed");
                self.ctx.notify(Notice::error(LOGOUT_FAILED));
                Err(error.into())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Confirmation dialogs
    // ─────────────────────────────────────────────────────────────────────

    pub fn request_confirmation(&self, action: Confirmation) -> Confirmation {
        self.lock().pending = Some(action);
        action
    }

    pub fn dismiss_confirmation(&self) {
        self.lock().pending = None;
    }

    /// Run the pending action.
    pub async fn confirm(&self) -> Result<(), FormError> {
        let action = self.lock().pending.ok_or(FormError::NothingToConfirm)?;
        match action {
            Confirmation::Logout => self.logout().await,
            Confirmation::DeleteProfile => self.delete().await.map(|_| ()),
        }
    }
}
