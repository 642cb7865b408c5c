mod common;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Notify;

use atelier_app::profile_form::{DELETE_FAILED, DELETED, SAVED};
use atelier_app::{
    AppConfig, AppContext, Confirmation, FormError, NavigationStack, Navigator, NoticeKind, NoticeLog,
    ProfileFormController, Route,
};
use atelier_auth::{AuthError, AuthOp, IdentityProvider, InMemoryIdentityProvider};
use atelier_core::{ProfileField, Subscription};
use atelier_infra::{DeletionPolicy, DeletionState, DocumentStore, InMemoryDocumentStore, StoreError, StorePath};

use common::Harness;

fn fill(form: &ProfileFormController) {
    form.set_field(ProfileField::Name, "Ayesha").unwrap();
    form.set_field(ProfileField::Age, "29").unwrap();
    form.set_field(ProfileField::Gender, "Female").unwrap();
    form.set_field(ProfileField::Phone, "03451234567").unwrap();
    form.set_field(ProfileField::Role, "artist").unwrap();
}

#[tokio::test]
async fn saved_profile_loads_back_unchanged() {
    let h = Harness::new();
    let identity = h.signed_in("ayesha@example.com");

    let form = ProfileFormController::new(h.ctx.clone());
    form.load_profile(&identity).await.unwrap();
    assert!(form.edit_mode());
    fill(&form);
    form.save().await.unwrap();

    assert!(!form.edit_mode());
    assert_eq!(h.log.last().unwrap().title, SAVED);
    assert_eq!(h.log.last().unwrap().kind, NoticeKind::Success);

    let reopened = ProfileFormController::new(h.ctx.clone());
    reopened.load_profile(&identity).await.unwrap();
    assert_eq!(reopened.fields(), form.fields());
    assert!(!reopened.edit_mode());
}

#[tokio::test]
async fn confirmed_delete_removes_everything_and_lands() {
    let h = Harness::new();
    let identity = h.signed_in("gone@example.com");
    h.seed(identity.id.as_str(), "Gone", "visitor");

    let form = ProfileFormController::new(h.ctx.clone());
    form.load_profile(&identity).await.unwrap();
    let dialog = form.request_confirmation(Confirmation::DeleteProfile);
    assert_eq!(dialog.title(), "Delete Profile?");
    form.confirm().await.unwrap();

    assert_eq!(h.nav.current(), Some(Route::Landing));
    assert_eq!(h.stored_profile(&identity.id).await, None);
    assert!(!h.provider.account_exists(&identity.id));
    assert_eq!(h.log.last().unwrap().title, DELETED);
}

#[tokio::test]
async fn failed_account_deletion_still_lands_on_landing() {
    let config = AppConfig {
        deletion_policy: DeletionPolicy::Proceed,
        ..AppConfig::default()
    };
    let h = Harness::with_config(config);
    let identity = h.signed_in("stuck@example.com");
    h.seed(identity.id.as_str(), "Stuck", "artist");
    h.nav.reset(Route::Home);

    let form = ProfileFormController::new(h.ctx.clone());
    form.load_profile(&identity).await.unwrap();
    h.provider.fail_next(
        AuthOp::DeleteAccount,
        AuthError::unclassified("auth/requires-recent-login"),
    );

    let result = form.delete().await;

    assert_eq!(result.unwrap_err(), FormError::Deletion(DeletionState::Orphaned));
    assert_eq!(h.nav.history(), [Route::Landing]);
    assert_eq!(h.log.last().unwrap().title, DELETE_FAILED);
    assert_eq!(h.stored_profile(&identity.id).await, None);
    assert!(h.provider.account_exists(&identity.id));
    assert!(h.provider.current_identity().is_none());
}

#[tokio::test]
async fn default_policy_restores_the_record_when_account_deletion_fails() {
    let h = Harness::new();
    let identity = h.signed_in("kept@example.com");
    h.seed(identity.id.as_str(), "Kept", "visitor");

    let form = ProfileFormController::new(h.ctx.clone());
    form.load_profile(&identity).await.unwrap();
    h.provider
        .fail_next(AuthOp::DeleteAccount, AuthError::unclassified("network"));

    let result = form.delete().await;

    assert_eq!(result.unwrap_err(), FormError::Deletion(DeletionState::Compensated));
    assert_eq!(h.nav.current(), Some(Route::Landing));
    assert_eq!(h.stored_profile(&identity.id).await.unwrap().name, "Kept");
    assert!(h.provider.current_identity().is_none());
}

#[tokio::test]
async fn logout_resets_to_landing_on_success() {
    let h = Harness::new();
    let identity = h.signed_in("bye@example.com");
    h.nav.reset(Route::Home);

    let form = ProfileFormController::new(h.ctx.clone());
    form.load_profile(&identity).await.unwrap();
    form.request_confirmation(Confirmation::Logout);
    form.confirm().await.unwrap();

    assert_eq!(h.nav.history(), [Route::Landing]);
    assert!(h.provider.current_identity().is_none());
}

/// Store whose writes wait for the test to open a gate.
struct GatedStore {
    inner: InMemoryDocumentStore,
    gate: Arc<Notify>,
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.inner.read_once(path).await
    }

    fn subscribe(&self, path: &StorePath) -> Subscription<Option<Value>> {
        self.inner.subscribe(path)
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.gate.notified().await;
        self.inner.update(path, fields).await
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.gate.notified().await;
        self.inner.remove(path).await
    }
}

#[tokio::test]
async fn second_save_while_first_is_running_is_rejected() {
    let provider = InMemoryIdentityProvider::new();
    let inner = InMemoryDocumentStore::new();
    let gate = Arc::new(Notify::new());
    let ctx = AppContext::new(
        Arc::new(provider.clone()),
        Arc::new(GatedStore {
            inner: inner.clone(),
            gate: Arc::clone(&gate),
        }),
        Arc::new(NavigationStack::new()),
        Arc::new(NoticeLog::new()),
        AppConfig::default(),
    );
    let id = provider.register_email_account("twice@example.com", "secret1", true);
    let identity = provider.restore_session(&id).unwrap();

    let form = ProfileFormController::new(ctx);
    form.load_profile(&identity).await.unwrap();
    fill(&form);

    let (first, second) = tokio::join!(form.save(), async {
        let second = form.save().await;
        let edit = form.set_field(ProfileField::Name, "Late");
        gate.notify_one();
        (second, edit)
    });

    assert!(first.is_ok());
    assert_eq!(second.0, Err(FormError::Busy));
    assert_eq!(second.1, Err(FormError::Busy));
    assert_eq!(inner.write_count(), 1);
    assert!(!form.is_busy());
}
