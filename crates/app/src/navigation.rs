//! Screens and the navigator the UI shell provides.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Whether the phone screen was opened to create an account or to sign in.
///
/// Only the label differs; the provider treats both the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneMode {
    SignUp,
    SignIn,
}

impl PhoneMode {
    pub fn label(&self) -> &'static str {
        match self {
            PhoneMode::SignUp => "Sign up",
            PhoneMode::SignIn => "Sign in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Route {
    /// Entry screen for signed-out users.
    Landing,
    Signup,
    Login,
    PhoneVerify { mode: PhoneMode },
    /// Profile screen (also onboarding for users without a record).
    Home,
    AdminDashboard,
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Landing => "landing",
            Route::Signup => "signup",
            Route::Login => "login",
            Route::PhoneVerify { .. } => "phone_verify",
            Route::Home => "home",
            Route::AdminDashboard => "admin_dashboard",
        }
    }
}

impl core::fmt::Display for Route {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Navigation shell. Implemented by the UI.
pub trait Navigator: Send + Sync {
    /// Replace the whole history with `route` (no back navigation).
    fn reset(&self, route: Route);

    /// Open `route` on top of the current screen.
    fn push(&self, route: Route);
}

#[derive(Debug, Default)]
struct StackState {
    stack: Vec<Route>,
    resets: usize,
}

/// Navigator that records the history in memory.
///
/// - No IO
/// - Cloning shares the same history
#[derive(Debug, Clone, Default)]
pub struct NavigationStack {
    state: Arc<Mutex<StackState>>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Route> {
        self.state.lock().ok()?.stack.last().copied()
    }

    /// Routes from bottom to top.
    pub fn history(&self) -> Vec<Route> {
        self.state
            .lock()
            .map(|s| s.stack.clone())
            .unwrap_or_default()
    }

    pub fn reset_count(&self) -> usize {
        self.state.lock().map(|s| s.resets).unwrap_or(0)
    }

    /// Go back one screen. Returns the new top, or `None` at the bottom.
    pub fn pop(&self) -> Option<Route> {
        let mut state = self.state.lock().ok()?;
        if state.stack.len() > 1 {
            state.stack.pop();
        }
        state.stack.last().copied()
    }
}

impl Navigator for NavigationStack {
    fn reset(&self, route: Route) {
        tracing::debug!(%route, "navigation reset");
        if let Ok(mut state) = self.state.lock() {
            state.stack.clear();
            state.stack.push(route);
            state.resets += 1;
        }
    }

    fn push(&self, route: Route) {
        tracing::debug!(%route, "navigation push");
        if let Ok(mut state) = self.state.lock() {
            state.stack.push(route);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_replaces_history() {
        let nav = NavigationStack::new();
        nav.reset(Route::Landing);
        nav.push(Route::PhoneVerify {
            mode: PhoneMode::SignIn,
        });
        nav.reset(Route::Home);

        assert_eq!(nav.history(), [Route::Home]);
        assert_eq!(nav.reset_count(), 2);
    }

    #[test]
    fn pop_never_empties_the_stack() {
        let nav = NavigationStack::new();
        nav.reset(Route::Landing);
        nav.push(Route::Signup);

        assert_eq!(nav.pop(), Some(Route::Landing));
        assert_eq!(nav.pop(), Some(Route::Landing));
        assert_eq!(nav.current(), Some(Route::Landing));
    }
}
