//! Shared wiring for integration tests: in-memory collaborators plus
//! recording navigator and notifier.

#![allow(dead_code)]

use std::sync::Arc;

use atelier_app::{AppConfig, AppContext, NavigationStack, NoticeLog};
use atelier_auth::{Identity, InMemoryIdentityProvider};
use atelier_core::{UserId, UserProfile};
use atelier_infra::{InMemoryDocumentStore, StorePath};
use serde_json::json;

pub struct Harness {
    pub provider: InMemoryIdentityProvider,
    pub store: InMemoryDocumentStore,
    pub nav: NavigationStack,
    pub log: NoticeLog,
    pub ctx: AppContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let _ = atelier_observability::init_with(atelier_observability::LogFormat::Pretty);

        let provider = InMemoryIdentityProvider::new();
        let store = InMemoryDocumentStore::new();
        let nav = NavigationStack::new();
        let log = NoticeLog::new();
        let ctx = AppContext::new(
            Arc::new(provider.clone()),
            Arc::new(store.clone()),
            Arc::new(nav.clone()),
            Arc::new(log.clone()),
            config,
        );
        Self {
            provider,
            store,
            nav,
            log,
            ctx,
        }
    }

    /// Register a verified email account and sign it in.
    pub fn signed_in(&self, email: &str) -> Identity {
        let id = self.provider.register_email_account(email, "secret1", true);
        self.provider
            .restore_session(&id)
            .expect("account was just registered")
    }

    /// Write a stored record directly, bypassing the repository.
    pub fn seed(&self, id: &str, name: &str, role: &str) {
        let path = StorePath::parse("/users").unwrap().child(id);
        self.store
            .set(
                &path,
                json!({
                    "name": name,
                    "age": "30",
                    "gender": "Male",
                    "phone": "03001234567",
                    "role": role,
                }),
            )
            .unwrap();
    }

    pub async fn stored_profile(&self, id: &UserId) -> Option<UserProfile> {
        self.ctx.profiles.load(id).await.unwrap()
    }
}

pub fn profile(name: &str, role: &str) -> UserProfile {
    UserProfile {
        name: name.into(),
        age: "24".into(),
        gender: "Female".into(),
        phone: "03211234567".into(),
        role: role.into(),
    }
}
