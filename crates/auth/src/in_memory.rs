//! In-memory identity provider for tests/dev.
//!
//! - No IO
//! - Sessions are broadcast to subscribers in order
//! - One-shot failure injection per operation (`fail_next`)

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use atelier_core::validation::{MIN_PASSWORD_LEN, is_valid_email};
use atelier_core::{Fanout, Subscription, UserId};

use crate::provider::{GoogleAccount, GoogleSignIn, IdentityProvider, PhoneConfirmation};
use crate::{AuthError, Identity, SessionEvent};

/// Operations that can be made to fail with [`InMemoryIdentityProvider::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthOp {
    CreateUser,
    SignInEmail,
    SignInGoogle,
    SignInPhone,
    ConfirmCode,
    SendVerification,
    SignOut,
    DeleteAccount,
}

#[derive(Debug, Clone)]
struct Account {
    id: UserId,
    email: Option<String>,
    password: Option<String>,
    phone_number: Option<String>,
    google_token: Option<String>,
    email_verified: bool,
}

impl Account {
    fn new() -> Self {
        Self {
            id: UserId::generate(),
            email: None,
            password: None,
            phone_number: None,
            google_token: None,
            email_verified: false,
        }
    }

    fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            email_verified: self.email_verified,
        }
    }
}

#[derive(Debug, Default)]
struct ProviderState {
    accounts: Vec<Account>,
    current: Option<UserId>,
    pending_codes: HashMap<String, String>,
    code_counter: u32,
    verification_emails: Vec<UserId>,
    failures: HashMap<AuthOp, AuthError>,
}

impl ProviderState {
    fn current_account(&self) -> Option<&Account> {
        let id = self.current.as_ref()?;
        self.accounts.iter().find(|a| &a.id == id)
    }

    fn take_failure(&mut self, op: AuthOp) -> Result<(), AuthError> {
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-memory identity provider.
///
/// Cloning shares the same accounts and session.
#[derive(Clone, Default)]
pub struct InMemoryIdentityProvider {
    state: Arc<Mutex<ProviderState>>,
    sessions: Fanout<SessionEvent>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProviderState>, AuthError> {
        self.state
            .lock()
            .map_err(|_| AuthError::unclassified("provider state poisoned"))
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: AuthOp, error: AuthError) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.insert(op, error);
        }
    }

    /// Seed an email/password account without signing it in.
    pub fn register_email_account(&self, email: &str, password: &str, verified: bool) -> UserId {
        let mut account = Account::new();
        account.email = Some(email.trim().to_lowercase());
        account.password = Some(password.to_string());
        account.email_verified = verified;
        let id = account.id.clone();
        if let Ok(mut state) = self.state.lock() {
            state.accounts.push(account);
        }
        id
    }

    /// Mark the account's email as verified (the user clicked the link).
    pub fn verify_email(&self, email: &str) {
        let email = email.trim().to_lowercase();
        if let Ok(mut state) = self.state.lock() {
            for account in state.accounts.iter_mut() {
                if account.email.as_deref() == Some(email.as_str()) {
                    account.email_verified = true;
                }
            }
        }
    }

    /// Sign `user_id` in as if a session had been restored on launch.
    pub fn restore_session(&self, user_id: &UserId) -> Option<Identity> {
        let identity = {
            let mut state = self.state.lock().ok()?;
            let identity = state.accounts.iter().find(|a| &a.id == user_id)?.identity();
            state.current = Some(user_id.clone());
            identity
        };
        self.sessions.publish(Some(identity.clone()));
        Some(identity)
    }

    /// End the session from the provider side (e.g. token revoked).
    pub fn revoke_session(&self) {
        let changed = match self.state.lock() {
            Ok(mut state) => state.current.take().is_some(),
            Err(_) => false,
        };
        if changed {
            self.sessions.publish(None);
        }
    }

    /// Code most recently sent to `phone_number`.
    pub fn sent_code(&self, phone_number: &str) -> Option<String> {
        let state = self.state.lock().ok()?;
        state.pending_codes.get(phone_number).cloned()
    }

    /// Users a verification email was sent to, in send order.
    pub fn verification_emails(&self) -> Vec<UserId> {
        self.state
            .lock()
            .map(|s| s.verification_emails.clone())
            .unwrap_or_default()
    }

    pub fn account_exists(&self, user_id: &UserId) -> bool {
        self.state
            .lock()
            .map(|s| s.accounts.iter().any(|a| &a.id == user_id))
            .unwrap_or(false)
    }

    pub fn session_listener_count(&self) -> usize {
        self.sessions.listener_count()
    }

    fn sign_in(&self, state: &mut ProviderState, identity: Identity) -> Identity {
        state.current = Some(identity.id.clone());
        self.sessions.publish(Some(identity.clone()));
        identity
    }

    fn confirm_code(&self, phone_number: &str, code: &str) -> Result<Identity, AuthError> {
        let mut state = self.lock()?;
        state.take_failure(AuthOp::ConfirmCode)?;

        match state.pending_codes.get(phone_number) {
            Some(expected) if expected == code => {}
            _ => return Err(AuthError::InvalidVerificationCode),
        }
        state.pending_codes.remove(phone_number);

        let existing = state
            .accounts
            .iter()
            .find(|a| a.phone_number.as_deref() == Some(phone_number))
            .map(Account::identity);
        let identity = match existing {
            Some(identity) => identity,
            None => {
                let mut account = Account::new();
                account.phone_number = Some(phone_number.to_string());
                let identity = account.identity();
                state.accounts.push(account);
                identity
            }
        };

        tracing::debug!(user_id = %identity.id, "phone sign-in confirmed");
        Ok(self.sign_in(&mut state, identity))
    }
}

fn is_international_number(number: &str) -> bool {
    let Some(digits) = number.strip_prefix('+') else {
        return false;
    };
    (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn on_session_change(&self) -> Subscription<SessionEvent> {
        self.sessions.subscribe(Some(self.current_identity()))
    }

    fn current_identity(&self) -> Option<Identity> {
        let state = self.state.lock().ok()?;
        state.current_account().map(Account::identity)
    }

    async fn create_user_with_email(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let mut state = self.lock()?;
        state.take_failure(AuthOp::CreateUser)?;

        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        if state.accounts.iter().any(|a| a.email.as_deref() == Some(email.as_str())) {
            return Err(AuthError::EmailAlreadyInUse);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::unclassified("auth/weak-password"));
        }

        let mut account = Account::new();
        account.email = Some(email);
        account.password = Some(password.to_string());
        let identity = account.identity();
        state.accounts.push(account);

        tracing::debug!(user_id = %identity.id, "email account created");
        Ok(self.sign_in(&mut state, identity))
    }

    async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let mut state = self.lock()?;
        state.take_failure(AuthOp::SignInEmail)?;

        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        let account = state
            .accounts
            .iter()
            .find(|a| a.email.as_deref() == Some(email.as_str()))
            .ok_or(AuthError::UserNotFound)?;
        if account.password.as_deref() != Some(password) {
            return Err(AuthError::WrongPassword);
        }

        let identity = account.identity();
        Ok(self.sign_in(&mut state, identity))
    }

    async fn sign_in_with_google_credential(&self, id_token: &str) -> Result<Identity, AuthError> {
        let mut state = self.lock()?;
        state.take_failure(AuthOp::SignInGoogle)?;

        if id_token.trim().is_empty() {
            return Err(AuthError::InvalidCredential);
        }

        let existing = state
            .accounts
            .iter()
            .find(|a| a.google_token.as_deref() == Some(id_token))
            .map(Account::identity);
        let identity = match existing {
            Some(identity) => identity,
            None => {
                let mut account = Account::new();
                account.google_token = Some(id_token.to_string());
                account.email_verified = true;
                let identity = account.identity();
                state.accounts.push(account);
                identity
            }
        };

        Ok(self.sign_in(&mut state, identity))
    }

    async fn sign_in_with_phone(&self, phone_number: &str) -> Result<Box<dyn PhoneConfirmation>, AuthError> {
        let mut state = self.lock()?;
        state.take_failure(AuthOp::SignInPhone)?;

        if !is_international_number(phone_number) {
            return Err(AuthError::InvalidPhoneNumber);
        }

        state.code_counter += 1;
        let code = format!("{:06}", 100_000 + state.code_counter % 900_000);
        state.pending_codes.insert(phone_number.to_string(), code);

        Ok(Box::new(InMemoryPhoneConfirmation {
            provider: self.clone(),
            phone_number: phone_number.to_string(),
        }))
    }

    async fn send_email_verification(&self) -> Result<(), AuthError> {
        let mut state = self.lock()?;
        state.take_failure(AuthOp::SendVerification)?;

        let id = state.current.clone().ok_or(AuthError::NoCurrentUser)?;
        state.verification_emails.push(id);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        {
            let mut state = self.lock()?;
            state.take_failure(AuthOp::SignOut)?;
        }
        self.revoke_session();
        Ok(())
    }

    async fn delete_current_account(&self) -> Result<(), AuthError> {
        {
            let mut state = self.lock()?;
            state.take_failure(AuthOp::DeleteAccount)?;

            let id = state.current.take().ok_or(AuthError::NoCurrentUser)?;
            state.accounts.retain(|a| a.id != id);
            tracing::debug!(user_id = %id, "account deleted");
        }
        self.sessions.publish(None);
        Ok(())
    }
}

struct InMemoryPhoneConfirmation {
    provider: InMemoryIdentityProvider,
    phone_number: String,
}

#[async_trait]
impl PhoneConfirmation for InMemoryPhoneConfirmation {
    fn phone_number(&self) -> &str {
        &self.phone_number
    }

    async fn confirm(&self, code: &str) -> Result<Identity, AuthError> {
        self.provider.confirm_code(&self.phone_number, code)
    }
}

/// Scripted Google sign-in sheet.
#[derive(Debug, Clone)]
pub struct InMemoryGoogleSignIn {
    account: Option<GoogleAccount>,
    play_services: bool,
}

impl InMemoryGoogleSignIn {
    /// A device with Play services where the user picks `id_token`'s account.
    pub fn with_account(id_token: impl Into<String>) -> Self {
        Self {
            account: Some(GoogleAccount {
                id_token: id_token.into(),
                email: None,
            }),
            play_services: true,
        }
    }

    /// The user dismisses the sign-in sheet.
    pub fn cancelled() -> Self {
        Self {
            account: None,
            play_services: true,
        }
    }

    pub fn without_play_services() -> Self {
        Self {
            account: None,
            play_services: false,
        }
    }
}

#[async_trait]
impl GoogleSignIn for InMemoryGoogleSignIn {
    async fn has_play_services(&self) -> Result<(), AuthError> {
        if self.play_services {
            Ok(())
        } else {
            Err(AuthError::unclassified("play-services-not-available"))
        }
    }

    async fn sign_in(&self) -> Result<GoogleAccount, AuthError> {
        self.account
            .clone()
            .ok_or_else(|| AuthError::unclassified("sign-in-cancelled"))
    }
}
