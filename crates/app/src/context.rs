//! Handles to the external collaborators every controller needs.

use std::sync::Arc;

use atelier_auth::IdentityProvider;
use atelier_infra::{AccountDeletionSaga, DocumentStore, ProfileRepository};

use crate::config::AppConfig;
use crate::navigation::{Navigator, Route};
use crate::notice::{Notice, Notifier, Prompt};

/// Shared wiring for controllers. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: ProfileRepository,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
    pub config: AppConfig,
}

impl AppContext {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        config: AppConfig,
    ) -> Self {
        let profiles = ProfileRepository::new(store, config.users_path());
        Self {
            identity,
            profiles,
            navigator,
            notifier,
            config,
        }
    }

    pub fn deletion_saga(&self) -> AccountDeletionSaga {
        AccountDeletionSaga::new(
            self.profiles.clone(),
            Arc::clone(&self.identity),
            self.config.deletion_policy,
        )
    }

    pub fn reset_to(&self, route: Route) {
        self.navigator.reset(route);
    }

    pub fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    pub fn prompt(&self, prompt: Prompt) {
        self.notifier.prompt(prompt);
    }
}
