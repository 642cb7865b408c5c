use serde::{Deserialize, Serialize};

use atelier_core::UserId;

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject identifier; key of the user's profile record.
    pub id: UserId,

    pub email: Option<String>,

    /// Verified phone number in international format (phone sign-in only).
    pub phone_number: Option<String>,

    pub email_verified: bool,
}

impl Identity {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            phone_number: None,
            email_verified: false,
        }
    }
}

/// One notification from the session stream: the current identity, or `None`
/// once nobody is signed in.
pub type SessionEvent = Option<Identity>;
