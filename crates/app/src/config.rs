//! Runtime configuration from `ATELIER_*` environment variables.
//!
//! Every setting has a default; a malformed value is logged and ignored.

use serde::{Deserialize, Serialize};

use atelier_core::validation::DEFAULT_OTP_LENGTH;
use atelier_infra::profiles::DEFAULT_USERS_ROOT;
use atelier_infra::{DeletionPolicy, StorePath};

pub const ENV_USERS_ROOT: &str = "ATELIER_USERS_ROOT";
pub const ENV_DELETION_POLICY: &str = "ATELIER_DELETION_POLICY";
pub const ENV_DELETION_RETRIES: &str = "ATELIER_DELETION_RETRIES";
pub const ENV_DELETION_BACKOFF_MS: &str = "ATELIER_DELETION_BACKOFF_MS";
pub const ENV_GOOGLE_WEB_CLIENT_ID: &str = "ATELIER_GOOGLE_WEB_CLIENT_ID";
pub const ENV_OTP_LENGTH: &str = "ATELIER_OTP_LENGTH";

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Collection holding one profile record per user.
    pub users_root: StorePathConfig,
    pub deletion_policy: DeletionPolicy,
    /// OAuth web client id handed to the native Google sign-in step.
    pub google_web_client_id: Option<String>,
    /// Digits in a phone verification code.
    pub otp_length: usize,
}

/// Store path kept as its string form so the config stays serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorePathConfig(String);

impl StorePathConfig {
    pub fn path(&self) -> StorePath {
        StorePath::parse(&self.0).unwrap_or_else(|_| StorePath::root().child(DEFAULT_USERS_ROOT))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            users_root: StorePathConfig(format!("/{DEFAULT_USERS_ROOT}")),
            deletion_policy: DeletionPolicy::default(),
            google_web_client_id: None,
            otp_length: DEFAULT_OTP_LENGTH,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_USERS_ROOT) {
            match StorePath::parse(&raw) {
                Ok(path) if !path.is_root() => config.users_root = StorePathConfig(path.to_string()),
                _ => tracing::warn!(key = ENV_USERS_ROOT, value = %raw, "invalid users root; using default"),
            }
        }

        let retries = parse_or_default(&lookup, ENV_DELETION_RETRIES, DEFAULT_RETRIES);
        let backoff_ms = parse_or_default(&lookup, ENV_DELETION_BACKOFF_MS, DEFAULT_BACKOFF_MS);
        if let Some(raw) = lookup(ENV_DELETION_POLICY) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "proceed" => config.deletion_policy = DeletionPolicy::Proceed,
                "retry" => {
                    config.deletion_policy = DeletionPolicy::RetryAccount {
                        attempts: retries.max(1),
                        backoff_ms,
                    }
                }
                "restore" => config.deletion_policy = DeletionPolicy::RestoreProfile,
                _ => tracing::warn!(key = ENV_DELETION_POLICY, value = %raw, "unknown deletion policy; using default"),
            }
        }

        config.google_web_client_id = lookup(ENV_GOOGLE_WEB_CLIENT_ID).filter(|id| !id.trim().is_empty());

        let otp_length = parse_or_default(&lookup, ENV_OTP_LENGTH, DEFAULT_OTP_LENGTH);
        if (4..=8).contains(&otp_length) {
            config.otp_length = otp_length;
        } else {
            tracing::warn!(key = ENV_OTP_LENGTH, otp_length, "otp length out of range; using default");
        }

        config
    }

    pub fn users_path(&self) -> StorePath {
        self.users_root.path()
    }
}

fn parse_or_default<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: core::str::FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid number; using default");
            default
        }),
    }
}
