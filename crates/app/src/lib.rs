//! `atelier-app` — headless application core.
//!
//! Every screen of the directory app is a controller with explicit state;
//! every external service is reached through the traits in `atelier-auth`
//! and `atelier-infra`. A UI shell renders controller state, forwards user
//! intents and implements [`Navigator`] and [`Notifier`].

pub mod admin;
pub mod config;
pub mod context;
pub mod flows;
pub mod guard;
pub mod navigation;
pub mod notice;
pub mod profile_form;
pub mod session;

pub use admin::{AdminDashboard, DashboardError, RoleDirectory, partition_by_role};
pub use config::AppConfig;
pub use context::AppContext;
pub use guard::{InFlight, InFlightGuard};
pub use navigation::{NavigationStack, Navigator, PhoneMode, Route};
pub use notice::{Notice, NoticeKind, NoticeLog, Notifier, Prompt};
pub use profile_form::{Confirmation, FormError, ProfileFormController};
pub use session::{SessionEffect, SessionInput, SessionMachine, SessionResolver, SessionState};
