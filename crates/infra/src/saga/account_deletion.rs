//! Account deletion saga.
//!
//! Deleting an account touches two services that share no transaction:
//! 1. remove the profile record from the document store
//! 2. delete the identity-provider account
//!
//! If step 2 fails after step 1 succeeded, the account would be left without
//! its profile. What happens then is decided by [`DeletionPolicy`]:
//! - `Proceed`: leave it (the account reads as "not onboarded" on next login)
//! - `RetryAccount`: retry step 2 with exponential backoff, then leave it
//! - `RestoreProfile`: compensate by writing the removed record back

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_auth::{AuthError, IdentityProvider};
use atelier_core::UserId;

use crate::profiles::ProfileRepository;
use crate::store::StoreError;

/// What to do when the account cannot be deleted after its profile was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeletionPolicy {
    Proceed,
    RetryAccount { attempts: u32, backoff_ms: u64 },
    #[default]
    RestoreProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeletionState {
    #[default]
    Started,
    SnapshotTaken,
    ProfileRemoved,
    /// Profile and account are gone.
    Completed,
    /// Account kept, profile put back as it was.
    Compensated,
    /// Account kept without its profile.
    Orphaned,
    /// Nothing was deleted.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionEvent {
    SnapshotTaken { had_profile: bool },
    SnapshotFailed { error: StoreError },
    ProfileRemoved,
    ProfileRemovalFailed { error: StoreError },
    AccountDeleteFailed { attempt: u32, error: AuthError },
    AccountDeleted,
    ProfileRestored,
    /// The user had no profile before deletion, so there is nothing to put back.
    NothingToRestore,
    RestoreFailed { error: StoreError },
    AccountOrphaned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub occurred_at: DateTime<Utc>,
    pub event: DeletionEvent,
}

fn apply(state: &mut DeletionState, event: &DeletionEvent) {
    match event {
        DeletionEvent::SnapshotTaken { .. } => *state = DeletionState::SnapshotTaken,
        DeletionEvent::SnapshotFailed { .. } | DeletionEvent::ProfileRemovalFailed { .. } => {
            *state = DeletionState::Failed;
        }
        DeletionEvent::ProfileRemoved => *state = DeletionState::ProfileRemoved,
        DeletionEvent::AccountDeleteFailed { .. } => {
            // Still waiting on the account step.
        }
        DeletionEvent::AccountDeleted => *state = DeletionState::Completed,
        DeletionEvent::ProfileRestored | DeletionEvent::NothingToRestore => {
            *state = DeletionState::Compensated;
        }
        DeletionEvent::RestoreFailed { .. } | DeletionEvent::AccountOrphaned => {
            *state = DeletionState::Orphaned;
        }
    }
}

/// Outcome of one saga run, with the event trail that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    pub user_id: UserId,
    pub state: DeletionState,
    pub events: Vec<RecordedEvent>,
}

impl DeletionReport {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            state: DeletionState::Started,
            events: Vec::new(),
        }
    }

    fn record(&mut self, event: DeletionEvent) {
        apply(&mut self.state, &event);
        self.events.push(RecordedEvent {
            occurred_at: Utc::now(),
            event,
        });
    }

    pub fn is_complete(&self) -> bool {
        self.state == DeletionState::Completed
    }

    /// Whether the profile record is gone from the store.
    pub fn profile_removed(&self) -> bool {
        matches!(self.state, DeletionState::Completed | DeletionState::Orphaned)
    }

    /// Last error reported by the identity provider, if any.
    pub fn account_error(&self) -> Option<&AuthError> {
        self.events.iter().rev().find_map(|e| match &e.event {
            DeletionEvent::AccountDeleteFailed { error, .. } => Some(error),
            _ => None,
        })
    }

    pub fn account_attempts(&self) -> usize {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    e.event,
                    DeletionEvent::AccountDeleteFailed { .. } | DeletionEvent::AccountDeleted
                )
            })
            .count()
    }
}

/// Runs the two-step deletion for the signed-in user.
pub struct AccountDeletionSaga {
    profiles: ProfileRepository,
    identity: Arc<dyn IdentityProvider>,
    policy: DeletionPolicy,
}

impl AccountDeletionSaga {
    pub fn new(
        profiles: ProfileRepository,
        identity: Arc<dyn IdentityProvider>,
        policy: DeletionPolicy,
    ) -> Self {
        Self {
            profiles,
            identity,
            policy,
        }
    }

    pub fn policy(&self) -> DeletionPolicy {
        self.policy
    }

    /// Delete `user_id`'s profile, then the current account.
    ///
    /// Never panics and never retries beyond what the policy asks for; the
    /// report says how far it got.
    pub async fn run(&self, user_id: &UserId) -> DeletionReport {
        let mut report = DeletionReport::new(user_id.clone());
        tracing::info!(user_id = %user_id, policy = ?self.policy, "account deletion started");

        let snapshot = if self.policy == DeletionPolicy::RestoreProfile {
            match self.profiles.load(user_id).await {
                Ok(profile) => {
                    report.record(DeletionEvent::SnapshotTaken {
                        had_profile: profile.is_some(),
                    });
                    profile
                }
                Err(error) => {
                    tracing::error!(user_id = %user_id, %error, "could not snapshot profile; nothing deleted");
                    report.record(DeletionEvent::SnapshotFailed { error });
                    return report;
                }
            }
        } else {
            None
        };

        if let Err(error) = self.profiles.remove(user_id).await {
            tracing::error!(user_id = %user_id, %error, "profile removal failed; nothing deleted");
            report.record(DeletionEvent::ProfileRemovalFailed { error });
            return report;
        }
        report.record(DeletionEvent::ProfileRemoved);

        let (attempts, mut delay) = match self.policy {
            DeletionPolicy::RetryAccount { attempts, backoff_ms } => {
                (attempts.max(1), Duration::from_millis(backoff_ms))
            }
            _ => (1, Duration::ZERO),
        };

        for attempt in 1..=attempts {
            match self.identity.delete_current_account().await {
                Ok(()) => {
                    tracing::info!(user_id = %user_id, attempt, "account deleted");
                    report.record(DeletionEvent::AccountDeleted);
                    return report;
                }
                Err(error) => {
                    tracing::warn!(user_id = %user_id, attempt, %error, "account deletion failed");
                    report.record(DeletionEvent::AccountDeleteFailed { attempt, error });
                    if attempt < attempts && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                        delay = next_backoff(delay);
                    }
                }
            }
        }

        match (self.policy, snapshot) {
            (DeletionPolicy::RestoreProfile, Some(profile)) => {
                match self.profiles.save(user_id, &profile).await {
                    Ok(()) => {
                        tracing::info!(user_id = %user_id, "profile restored after failed account deletion");
                        report.record(DeletionEvent::ProfileRestored);
                    }
                    Err(error) => {
                        tracing::error!(user_id = %user_id, %error, "profile restore failed; account orphaned");
                        report.record(DeletionEvent::RestoreFailed { error });
                    }
                }
            }
            (DeletionPolicy::RestoreProfile, None) => {
                report.record(DeletionEvent::NothingToRestore);
            }
            _ => {
                tracing::warn!(user_id = %user_id, "account left without profile");
                report.record(DeletionEvent::AccountOrphaned);
            }
        }

        report
    }
}

/// Double the retry delay, capping at `Duration::MAX`.
fn next_backoff(delay: Duration) -> Duration {
    delay.saturating_mul(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDocumentStore, StoreOp};
    use atelier_auth::{AuthOp, InMemoryIdentityProvider};
    use atelier_core::UserProfile;

    #[test]
    fn backoff_doubles_without_overflowing() {
        assert_eq!(next_backoff(Duration::from_millis(250)), Duration::from_millis(500));
        assert_eq!(next_backoff(Duration::MAX), Duration::MAX);
        assert_eq!(next_backoff(Duration::from_secs(u64::MAX)), Duration::MAX);
    }

    struct Fixture {
        store: InMemoryDocumentStore,
        provider: InMemoryIdentityProvider,
        profiles: ProfileRepository,
        user_id: UserId,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryDocumentStore::new();
        let provider = InMemoryIdentityProvider::new();
        let profiles = ProfileRepository::with_default_root(Arc::new(store.clone()));
        let user_id = provider.register_email_account("eve@example.com", "secret1", true);
        provider.restore_session(&user_id).unwrap();
        profiles
            .save(
                &user_id,
                &UserProfile {
                    name: "Eve".into(),
                    age: "30".into(),
                    gender: "Female".into(),
                    phone: "03001234567".into(),
                    role: "artist".into(),
                },
            )
            .await
            .unwrap();
        Fixture {
            store,
            provider,
            profiles,
            user_id,
        }
    }

    fn saga(f: &Fixture, policy: DeletionPolicy) -> AccountDeletionSaga {
        AccountDeletionSaga::new(f.profiles.clone(), Arc::new(f.provider.clone()), policy)
    }

    #[tokio::test]
    async fn happy_path_removes_profile_and_account() {
        let f = fixture().await;
        let report = saga(&f, DeletionPolicy::default()).run(&f.user_id).await;

        assert!(report.is_complete());
        assert_eq!(f.profiles.load(&f.user_id).await.unwrap(), None);
        assert!(!f.provider.account_exists(&f.user_id));
    }

    #[tokio::test]
    async fn proceed_policy_leaves_orphaned_account() {
        let f = fixture().await;
        f.provider
            .fail_next(AuthOp::DeleteAccount, AuthError::unclassified("auth/requires-recent-login"));

        let report = saga(&f, DeletionPolicy::Proceed).run(&f.user_id).await;

        assert_eq!(report.state, DeletionState::Orphaned);
        assert!(report.profile_removed());
        assert!(f.provider.account_exists(&f.user_id));
        assert_eq!(f.profiles.load(&f.user_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn restore_policy_puts_profile_back() {
        let f = fixture().await;
        f.provider
            .fail_next(AuthOp::DeleteAccount, AuthError::unclassified("auth/requires-recent-login"));

        let report = saga(&f, DeletionPolicy::RestoreProfile).run(&f.user_id).await;

        assert_eq!(report.state, DeletionState::Compensated);
        assert!(!report.profile_removed());
        let restored = f.profiles.load(&f.user_id).await.unwrap().unwrap();
        assert_eq!(restored.name, "Eve");
        assert!(report.account_error().is_some());
    }

    #[tokio::test]
    async fn retry_policy_retries_account_step() {
        let f = fixture().await;
        f.provider
            .fail_next(AuthOp::DeleteAccount, AuthError::unclassified("network-request-failed"));

        let policy = DeletionPolicy::RetryAccount {
            attempts: 3,
            backoff_ms: 0,
        };
        let report = saga(&f, policy).run(&f.user_id).await;

        assert!(report.is_complete());
        assert_eq!(report.account_attempts(), 2);
    }

    #[tokio::test]
    async fn failed_removal_deletes_nothing() {
        let f = fixture().await;
        f.store
            .fail_next(StoreOp::Remove, StoreError::backend("permission-denied"));

        let report = saga(&f, DeletionPolicy::Proceed).run(&f.user_id).await;

        assert_eq!(report.state, DeletionState::Failed);
        assert!(f.provider.account_exists(&f.user_id));
        assert!(f.profiles.load(&f.user_id).await.unwrap().is_some());
    }
}
