//! Coarse error classification of identity provider failures.

use thiserror::Error;

/// Failure reported by the identity provider.
///
/// Providers report string codes (`auth/wrong-password`, ...). Only the codes
/// the application reacts to get their own variant; everything else is
/// `Unclassified` and surfaces as a generic "try again later" notice.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("no user found for the given email")]
    UserNotFound,

    #[error("wrong password")]
    WrongPassword,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid phone number")]
    InvalidPhoneNumber,

    #[error("invalid verification code")]
    InvalidVerificationCode,

    #[error("email already in use")]
    EmailAlreadyInUse,

    #[error("no signed-in user")]
    NoCurrentUser,

    #[error("identity provider error: {0}")]
    Unclassified(String),
}

impl AuthError {
    /// Classify a provider error code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/invalid-credential" => AuthError::InvalidCredential,
            "auth/user-not-found" => AuthError::UserNotFound,
            "auth/wrong-password" => AuthError::WrongPassword,
            "auth/invalid-email" => AuthError::InvalidEmail,
            "auth/invalid-phone-number" => AuthError::InvalidPhoneNumber,
            "auth/invalid-verification-code" => AuthError::InvalidVerificationCode,
            "auth/email-already-in-use" => AuthError::EmailAlreadyInUse,
            "auth/no-current-user" => AuthError::NoCurrentUser,
            other => AuthError::Unclassified(other.to_string()),
        }
    }

    /// Provider code for this error.
    pub fn code(&self) -> &str {
        match self {
            AuthError::InvalidCredential => "auth/invalid-credential",
            AuthError::UserNotFound => "auth/user-not-found",
            AuthError::WrongPassword => "auth/wrong-password",
            AuthError::InvalidEmail => "auth/invalid-email",
            AuthError::InvalidPhoneNumber => "auth/invalid-phone-number",
            AuthError::InvalidVerificationCode => "auth/invalid-verification-code",
            AuthError::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthError::NoCurrentUser => "auth/no-current-user",
            AuthError::Unclassified(code) => code,
        }
    }

    pub fn unclassified(msg: impl Into<String>) -> Self {
        Self::Unclassified(msg.into())
    }

    pub fn is_classified(&self) -> bool {
        !matches!(self, AuthError::Unclassified(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        for code in [
            "auth/invalid-credential",
            "auth/user-not-found",
            "auth/wrong-password",
            "auth/invalid-email",
            "auth/invalid-phone-number",
            "auth/invalid-verification-code",
            "auth/email-already-in-use",
        ] {
            let err = AuthError::from_code(code);
            assert!(err.is_classified(), "{code}");
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn unknown_codes_are_unclassified() {
        let err = AuthError::from_code("auth/too-many-requests");
        assert_eq!(err, AuthError::Unclassified("auth/too-many-requests".into()));
        assert!(!err.is_classified());
    }
}
