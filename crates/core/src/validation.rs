//! Input validation rules shared by the onboarding and sign-up forms.
//!
//! All checks are pure and synchronous; they never touch external services.

use std::sync::LazyLock;

use regex::Regex;

/// Local mobile number format: `03`, an operator digit `0-4`, then 8 digits.
pub const LOCAL_PHONE_PATTERN: &str = r"^03[0-4][0-9]{8}$";

/// Email shape accepted by the sign-up form.
pub const EMAIL_PATTERN: &str = r"^[A-Za-z0-9_\-.]+@([A-Za-z0-9_\-]+\.)+[A-Za-z0-9_\-]{2,4}$";

/// Minimum password length enforced before calling the identity provider.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Number of digits in a phone verification code.
pub const DEFAULT_OTP_LENGTH: usize = 6;

static LOCAL_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LOCAL_PHONE_PATTERN).expect("static phone pattern"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("static email pattern"));

/// Whether `phone` is an 11-digit local mobile number.
pub fn is_valid_local_phone(phone: &str) -> bool {
    LOCAL_PHONE.is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Reasons a sign-up password is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordIssue {
    TooShort,
    ContainsSpace,
}

impl PasswordIssue {
    pub fn message(self) -> &'static str {
        match self {
            PasswordIssue::TooShort => "Password must be at least 6 characters long",
            PasswordIssue::ContainsSpace => "Password cannot contain spaces",
        }
    }
}

/// Check a new password. Length is checked before whitespace.
pub fn check_password(password: &str) -> Result<(), PasswordIssue> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordIssue::TooShort);
    }
    if password.contains(' ') {
        return Err(PasswordIssue::ContainsSpace);
    }
    Ok(())
}

/// Derive a local-format number from a provider-verified phone number.
///
/// Keeps the last 10 characters and prefixes `0`, so `+923001234567` becomes
/// `03001234567`. Shorter inputs are prefixed as-is.
pub fn local_phone_from_verified(verified: &str) -> String {
    let chars: Vec<char> = verified.chars().collect();
    let start = chars.len().saturating_sub(10);
    let tail: String = chars[start..].iter().collect();
    format!("0{tail}")
}

/// Whether `code` is a fully entered verification code of `len` digits.
pub fn is_complete_otp(code: &str, len: usize) -> bool {
    code.len() == len && code.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn local_phone_accepts_operator_prefixes() {
        assert!(is_valid_local_phone("03001234567"));
        assert!(is_valid_local_phone("03451234567"));
        assert!(!is_valid_local_phone("03501234567"));
        assert!(!is_valid_local_phone("123"));
        assert!(!is_valid_local_phone(""));
        assert!(!is_valid_local_phone("030012345678"));
    }

    #[test]
    fn email_pattern_matches_signup_form() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b-c_d@mail.example.org"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice example.com"));
        assert!(!is_valid_email("alice@example.museum"));
    }

    #[test]
    fn password_rules_report_first_issue() {
        assert_eq!(check_password("abc"), Err(PasswordIssue::TooShort));
        assert_eq!(check_password("abc def"), Err(PasswordIssue::ContainsSpace));
        assert_eq!(check_password("secret1"), Ok(()));
    }

    #[test]
    fn verified_phone_is_localized() {
        assert_eq!(local_phone_from_verified("+923001234567"), "03001234567");
        assert_eq!(local_phone_from_verified("12345"), "012345");
    }

    #[test]
    fn otp_requires_exact_digit_count() {
        assert!(is_complete_otp("123456", 6));
        assert!(!is_complete_otp("12345", 6));
        assert!(!is_complete_otp("12a456", 6));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every 11-digit number with a 030-034 prefix is accepted.
        #[test]
        fn operator_numbers_are_valid(op in 0u8..=4, rest in "[0-9]{8}") {
            let phone = format!("03{op}{rest}");
            prop_assert!(is_valid_local_phone(&phone));
        }

        /// Property: localizing any +92 number yields a valid local number.
        #[test]
        fn localized_numbers_round_trip(op in 0u8..=4, rest in "[0-9]{8}") {
            let verified = format!("+923{op}{rest}");
            prop_assert!(is_valid_local_phone(&local_phone_from_verified(&verified)));
        }
    }
}
