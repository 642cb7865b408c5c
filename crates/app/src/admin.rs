//! Admin dashboard: live lists of artists and visitors.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use thiserror::Error;

use atelier_auth::{AuthError, Identity, require_role};
use atelier_core::{ProfileRecord, Role, Subscription};
use atelier_infra::{StoreError, decode_collection};

use crate::context::AppContext;
use crate::guard::InFlight;
use crate::navigation::Route;
use crate::notice::Notice;
use crate::profile_form::{Confirmation, LOGOUT_FAILED};
use crate::session::PROFILE_READ_FAILED;

pub const NO_ARTISTS: &str = "No artists yet!";
pub const NO_VISITORS: &str = "No visitors yet!";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("another action is still running")]
    Busy,

    #[error("the dashboard is only available to admins")]
    NotAdmin,

    #[error("no confirmation pending")]
    NothingToConfirm,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Profile records grouped by role, each group in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDirectory {
    pub artists: Vec<ProfileRecord>,
    pub visitors: Vec<ProfileRecord>,
}

impl RoleDirectory {
    /// Text to show instead of an empty artist list.
    pub fn artists_placeholder(&self) -> Option<&'static str> {
        self.artists.is_empty().then_some(NO_ARTISTS)
    }

    pub fn visitors_placeholder(&self) -> Option<&'static str> {
        self.visitors.is_empty().then_some(NO_VISITORS)
    }
}

/// Split `records` into artists and visitors without reordering.
///
/// Admins and records without a known role belong to neither group.
pub fn partition_by_role(records: impl IntoIterator<Item = ProfileRecord>) -> RoleDirectory {
    let mut directory = RoleDirectory::default();
    for record in records {
        match record.role() {
            Some(Role::Artist) => directory.artists.push(record),
            Some(Role::Visitor) => directory.visitors.push(record),
            Some(Role::Admin) | None => {}
        }
    }
    directory
}

/// Admin view over the whole `/users` collection.
///
/// The viewer's role is checked once, on mount; later changes to the
/// viewer's own record do not unmount the view.
pub struct AdminDashboard {
    ctx: AppContext,
    subscription: Option<Subscription<Option<Value>>>,
    directory: RoleDirectory,
    pending: Mutex<Option<Confirmation>>,
    in_flight: InFlight,
}

impl AdminDashboard {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            subscription: None,
            directory: RoleDirectory::default(),
            pending: Mutex::new(None),
            in_flight: InFlight::new(),
        }
    }

    fn pending(&self) -> MutexGuard<'_, Option<Confirmation>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn directory(&self) -> &RoleDirectory {
        &self.directory
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Check the viewer is an admin, then start watching the collection.
    ///
    /// Mounting an already mounted dashboard replaces its subscription.
    pub async fn mount(&mut self, viewer: &Identity) -> Result<(), DashboardError> {
        self.unmount();

        let profile = self.ctx.profiles.load(&viewer.id).await.map_err(|error| {
            tracing::error!(user_id = %viewer.id, %error, "viewer profile read failed");
            self.ctx.notify(Notice::error(PROFILE_READ_FAILED));
            DashboardError::from(error)
        })?;
        let role = profile.as_ref().and_then(|p| p.role());
        if require_role(role, Role::Admin).is_err() {
            tracing::warn!(user_id = %viewer.id, role = ?role, "non-admin tried to open the dashboard");
            return Err(DashboardError::NotAdmin);
        }

        self.subscription = Some(self.ctx.profiles.watch_all());
        tracing::info!(user_id = %viewer.id, "admin dashboard mounted");
        self.refresh();
        Ok(())
    }

    /// Release the collection subscription. Safe to call when not mounted.
    pub fn unmount(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!("admin dashboard unmounted");
        }
    }

    /// Apply the newest queued collection snapshot, if any. Returns whether
    /// the directory was rebuilt.
    pub fn refresh(&mut self) -> bool {
        let Some(snapshot) = self.subscription.as_mut().and_then(|s| s.latest()) else {
            return false;
        };
        self.apply(snapshot);
        true
    }

    /// Wait for the next collection snapshot and apply it. `false` once
    /// unmounted or the store has gone away.
    pub async fn next(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.recv().await {
            Some(snapshot) => {
                self.apply(snapshot);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, snapshot: Option<Value>) {
        let decoded = decode_collection(snapshot.as_ref());
        if !decoded.skipped.is_empty() {
            tracing::warn!(skipped = ?decoded.skipped, "undecodable profile records skipped");
        }
        self.directory = partition_by_role(decoded.records);
        tracing::debug!(
            artists = self.directory.artists.len(),
            visitors = self.directory.visitors.len(),
            "directory rebuilt"
        );
    }

    pub fn request_confirmation(&self, action: Confirmation) -> Confirmation {
        *self.pending() = Some(action);
        action
    }

    pub fn dismiss_confirmation(&self) {
        *self.pending() = None;
    }

    pub fn pending_confirmation(&self) -> Option<Confirmation> {
        *self.pending()
    }

    /// Run the pending action. Only logout is offered on this screen.
    pub async fn confirm(&self) -> Result<(), DashboardError> {
        let action = self.pending().take();
        match action {
            Some(Confirmation::Logout) => self.logout().await,
            Some(Confirmation::DeleteProfile) | None => Err(DashboardError::NothingToConfirm),
        }
    }

    /// Sign out. Navigation happens only once the provider confirms.
    pub async fn logout(&self) -> Result<(), DashboardError> {
        let _guard = self.in_flight.try_begin().ok_or(DashboardError::Busy)?;
        *self.pending() = None;

        match self.ctx.identity.sign_out().await {
            Ok(()) => {
                tracing::info!("admin signed out");
                self.ctx.reset_to(Route::Landing);
                Ok(())
            }
            Err(error) => {
                tracing::error!(%error, "admin sign-out failed");
                self.ctx.notify(Notice::error(LOGOUT_FAILED));
                Err(error.into())
            }
        }
    }
}

impl Drop for AdminDashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::{UserId, UserProfile};
    use proptest::prelude::*;

    fn record(id: &str, role: &str) -> ProfileRecord {
        ProfileRecord {
            user_id: UserId::parse(id).unwrap(),
            profile: UserProfile {
                name: id.to_uppercase(),
                role: role.into(),
                ..UserProfile::default()
            },
        }
    }

    fn ids(records: &[ProfileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.user_id.as_str()).collect()
    }

    #[test]
    fn partitions_in_store_order() {
        let directory = partition_by_role([
            record("u1", "artist"),
            record("u2", "visitor"),
            record("u3", "artist"),
        ]);
        assert_eq!(ids(&directory.artists), ["u1", "u3"]);
        assert_eq!(ids(&directory.visitors), ["u2"]);
        assert_eq!(directory.artists_placeholder(), None);
    }

    #[test]
    fn empty_collection_shows_both_placeholders() {
        let directory = partition_by_role(Vec::new());
        assert_eq!(directory.artists_placeholder(), Some(NO_ARTISTS));
        assert_eq!(directory.visitors_placeholder(), Some(NO_VISITORS));
    }

    #[test]
    fn admins_and_unknown_roles_are_left_out() {
        let directory = partition_by_role([record("a", "admin"), record("b", ""), record("c", "curator")]);
        assert_eq!(directory, RoleDirectory::default());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn partition_keeps_every_artist_and_visitor_in_order(
            roles in proptest::collection::vec(prop_oneof![
                Just("artist"), Just("visitor"), Just("admin"), Just("")
            ], 0..40)
        ) {
            let records: Vec<ProfileRecord> = roles
                .iter()
                .enumerate()
                .map(|(i, role)| record(&format!("u{i}"), role))
                .collect();
            let directory = partition_by_role(records.clone());

            let expected_artists: Vec<&str> = records.iter().filter(|r| r.profile.role == "artist").map(|r| r.user_id.as_str()).collect();
            let expected_visitors: Vec<&str> = records.iter().filter(|r| r.profile.role == "visitor").map(|r| r.user_id.as_str()).collect();
            prop_assert_eq!(ids(&directory.artists), expected_artists);
            prop_assert_eq!(ids(&directory.visitors), expected_visitors);
        }
    }
}
