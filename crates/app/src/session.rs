//! Session resolution: decide the start screen from the session and the
//! signed-in user's profile record.
//!
//! [`SessionMachine`] is the pure part: it consumes inputs and returns the
//! effects to run. [`SessionResolver`] owns the session subscription and
//! executes those effects against the store, the navigator and the notifier.

use std::collections::VecDeque;

use atelier_auth::{Identity, SessionEvent};
use atelier_core::{Role, Subscription, UserId, UserProfile};
use atelier_infra::{ProfileRepository, StoreError};

use crate::context::AppContext;
use crate::navigation::Route;
use crate::notice::Notice;

pub const PROFILE_READ_FAILED: &str = "An unexpected error occurred!";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing heard from the identity provider yet.
    #[default]
    Unknown,
    /// Signed in; waiting for the one profile read issued for `epoch`.
    Resolving { identity: Identity, epoch: u64 },
    Unauthenticated,
    /// Signed in without a profile record (or the record could not be read).
    AuthenticatedNoProfile { identity: Identity },
    AuthenticatedWithProfile {
        identity: Identity,
        role: Option<Role>,
    },
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Resolving { identity, .. }
            | SessionState::AuthenticatedNoProfile { identity }
            | SessionState::AuthenticatedWithProfile { identity, .. } => Some(identity),
            SessionState::Unknown | SessionState::Unauthenticated => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Unknown | SessionState::Resolving { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    SessionChanged(SessionEvent),
    ProfileLoaded {
        epoch: u64,
        result: Result<Option<UserProfile>, StoreError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    ReadProfile { epoch: u64, user_id: UserId },
    /// Always a stack reset.
    Navigate(Route),
    Notify(Notice),
}

/// Start screen for a signed-in user with `profile`.
pub fn destination_for(profile: Option<&UserProfile>) -> Route {
    match profile {
        Some(p) if p.is_admin() => Route::AdminDashboard,
        _ => Route::Home,
    }
}

/// One profile read, then the start screen for that user.
pub async fn lookup_destination(profiles: &ProfileRepository, user_id: &UserId) -> Result<Route, StoreError> {
    let profile = profiles.load(user_id).await?;
    Ok(destination_for(profile.as_ref()))
}

/// Pure session state machine.
///
/// Every identity event starts a new epoch; a profile read answering an
/// older epoch is dropped.
#[derive(Debug, Clone, Default)]
pub struct SessionMachine {
    state: SessionState,
    epoch: u64,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn handle(&mut self, input: SessionInput) -> Vec<SessionEffect> {
        match input {
            SessionInput::SessionChanged(None) => {
                self.epoch += 1;
                self.state = SessionState::Unauthenticated;
                vec![SessionEffect::Navigate(Route::Landing)]
            }
            SessionInput::SessionChanged(Some(identity)) => {
                self.epoch += 1;
                let user_id = identity.id.clone();
                self.state = SessionState::Resolving {
                    identity,
                    epoch: self.epoch,
                };
                vec![SessionEffect::ReadProfile {
                    epoch: self.epoch,
                    user_id,
                }]
            }
            SessionInput::ProfileLoaded { epoch, result } => self.profile_loaded(epoch, result),
        }
    }

    fn profile_loaded(&mut self, epoch: u64, result: Result<Option<UserProfile>, StoreError>) -> Vec<SessionEffect> {
        let identity = match &self.state {
            SessionState::Resolving { identity, epoch: pending } if *pending == epoch => identity.clone(),
            _ => {
                tracing::debug!(epoch, current = self.epoch, "stale profile read ignored");
                return Vec::new();
            }
        };

        match result {
            Ok(Some(profile)) => {
                let route = destination_for(Some(&profile));
                self.state = SessionState::AuthenticatedWithProfile {
                    identity,
                    role: profile.role(),
                };
                vec![SessionEffect::Navigate(route)]
            }
            Ok(None) => {
                self.state = SessionState::AuthenticatedNoProfile { identity };
                vec![SessionEffect::Navigate(Route::Home)]
            }
            Err(error) => {
                tracing::warn!(user_id = %identity.id, %error, "profile read failed during session resolution");
                self.state = SessionState::AuthenticatedNoProfile { identity };
                vec![
                    SessionEffect::Notify(Notice::error(PROFILE_READ_FAILED)),
                    SessionEffect::Navigate(Route::Home),
                ]
            }
        }
    }
}

/// Drives a [`SessionMachine`] from the identity provider's session stream.
///
/// Holds at most one session subscription, released on [`stop`](Self::stop)
/// or drop.
pub struct SessionResolver {
    ctx: AppContext,
    machine: SessionMachine,
    subscription: Option<Subscription<SessionEvent>>,
}

impl SessionResolver {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            machine: SessionMachine::new(),
            subscription: None,
        }
    }

    /// Subscribe to session changes. A second call is a no-op.
    pub fn start(&mut self) {
        if self.subscription.is_none() {
            tracing::debug!("session resolver started");
            self.subscription = Some(self.ctx.identity.on_session_change());
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!("session resolver stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn state(&self) -> &SessionState {
        self.machine.state()
    }

    /// Handle every session event already queued. Returns how many there were.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.subscription.as_mut().and_then(|s| s.try_recv()) {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Wait for the next session event and handle it. `false` once the
    /// stream has ended or the resolver is stopped.
    pub async fn next(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.recv().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }

    /// Handle events until the stream ends.
    pub async fn run(&mut self) {
        while self.next().await {}
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        tracing::info!(
            user_id = event.as_ref().map(|i| i.id.as_str()).unwrap_or("-"),
            "session changed"
        );
        let mut effects: VecDeque<SessionEffect> = self.machine.handle(SessionInput::SessionChanged(event)).into();

        while let Some(effect) = effects.pop_front() {
            match effect {
                SessionEffect::ReadProfile { epoch, user_id } => {
                    let result = self.ctx.profiles.load(&user_id).await;
                    effects.extend(self.machine.handle(SessionInput::ProfileLoaded { epoch, result }));
                }
                SessionEffect::Navigate(route) => {
                    tracing::info!(%route, epoch = self.machine.epoch(), "session routed");
                    self.ctx.reset_to(route);
                }
                SessionEffect::Notify(notice) => self.ctx.notify(notice),
            }
        }
    }
}

impl Drop for SessionResolver {
    fn drop(&mut self) {
        self.stop();
    }
}
