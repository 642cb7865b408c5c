//! The user profile record and its field-level validation.

use std::collections::BTreeSet;

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DomainError;
use crate::id::UserId;
use crate::validation::is_valid_local_phone;

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// Directory role. Decides which screen a signed-in user lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Visitor,
    Artist,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Visitor => "visitor",
            Role::Artist => "artist",
            Role::Admin => "admin",
        }
    }

    /// Roles a user may pick for themselves on the profile form.
    pub fn self_selectable() -> [Role; 2] {
        [Role::Visitor, Role::Artist]
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visitor" => Ok(Role::Visitor),
            "artist" => Ok(Role::Artist),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UserProfile
// ─────────────────────────────────────────────────────────────────────────────

/// Profile record as stored at `/users/{userId}`.
///
/// Every field is a string and any of them may be missing in stored data;
/// missing fields decode as empty strings. `role` is kept verbatim so that a
/// save never rewrites a value this client does not understand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub age: String,
    #[serde(deserialize_with = "lenient_string")]
    pub gender: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub role: String,
}

impl UserProfile {
    /// Parsed role; `None` for an empty or unrecognised value.
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }
}

/// Accept strings, numbers and booleans; anything else (null, objects) decodes
/// as an empty string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// A profile together with the user that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub user_id: UserId,
    pub profile: UserProfile,
}

impl ProfileRecord {
    pub fn role(&self) -> Option<Role> {
        self.profile.role()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Editable fields + validation
// ─────────────────────────────────────────────────────────────────────────────

/// Fields shown on the profile form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProfileField {
    Name,
    Age,
    Gender,
    Phone,
    Role,
}

impl ProfileField {
    pub const ALL: [ProfileField; 5] = [
        ProfileField::Name,
        ProfileField::Age,
        ProfileField::Gender,
        ProfileField::Phone,
        ProfileField::Role,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProfileField::Name => "Name",
            ProfileField::Age => "Age",
            ProfileField::Gender => "Gender",
            ProfileField::Phone => "Phone Number (e.g. 03xxxxxxxxx)",
            ProfileField::Role => "Role",
        }
    }
}

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldIssue {
    Required,
    InvalidPhone,
    UnknownRole,
    /// A known role the user may not give themselves.
    RoleNotSelectable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldError {
    pub field: ProfileField,
    pub issue: FieldIssue,
}

impl FieldError {
    pub fn message(&self) -> &'static str {
        match self.issue {
            FieldIssue::Required => "Please fill in all fields!",
            FieldIssue::InvalidPhone => "Phone number is not valid!",
            FieldIssue::UnknownRole | FieldIssue::RoleNotSelectable => "Select a role",
        }
    }
}

/// Set of field-level errors. Empty means the form may be saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: BTreeSet<FieldError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn has(&self, field: ProfileField, issue: FieldIssue) -> bool {
        self.errors.contains(&FieldError { field, issue })
    }

    pub fn for_field(&self, field: ProfileField) -> Option<FieldIssue> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.issue)
    }

    /// True if any field is missing. Missing fields are reported before
    /// format errors on the form.
    pub fn has_missing(&self) -> bool {
        self.errors.iter().any(|e| e.issue == FieldIssue::Required)
    }

    fn push(&mut self, field: ProfileField, issue: FieldIssue) {
        self.errors.insert(FieldError { field, issue });
    }
}

/// Current values of the profile form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub phone: String,
    pub role: String,
}

impl ProfileFields {
    pub fn get(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::Name => &self.name,
            ProfileField::Age => &self.age,
            ProfileField::Gender => &self.gender,
            ProfileField::Phone => &self.phone,
            ProfileField::Role => &self.role,
        }
    }

    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        match field {
            ProfileField::Name => self.name = value,
            ProfileField::Age => self.age = value,
            ProfileField::Gender => self.gender = value,
            ProfileField::Phone => self.phone = value,
            ProfileField::Role => self.role = value,
        }
    }

    /// Validate every field.
    ///
    /// - All fields are required.
    /// - A non-empty phone must match the local mobile pattern.
    /// - A non-empty role must be a known role.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for field in ProfileField::ALL {
            if self.get(field).trim().is_empty() {
                report.push(field, FieldIssue::Required);
            }
        }

        if !self.phone.is_empty() && !is_valid_local_phone(&self.phone) {
            report.push(ProfileField::Phone, FieldIssue::InvalidPhone);
        }

        if !self.role.is_empty() && self.role.parse::<Role>().is_err() {
            report.push(ProfileField::Role, FieldIssue::UnknownRole);
        }

        report
    }

    /// Validate the values as an edit of `committed`.
    ///
    /// On top of [`validate`](Self::validate), the role must be one the user
    /// can pick for themselves unless `committed` already holds it.
    pub fn validate_edit(&self, committed: &ProfileFields) -> ValidationReport {
        let mut report = self.validate();
        if let Ok(role) = self.role.parse::<Role>() {
            if !Role::self_selectable().contains(&role) && self.role != committed.role {
                report.push(ProfileField::Role, FieldIssue::RoleNotSelectable);
            }
        }
        report
    }
}

impl From<UserProfile> for ProfileFields {
    fn from(p: UserProfile) -> Self {
        Self {
            name: p.name,
            age: p.age,
            gender: p.gender,
            phone: p.phone,
            role: p.role,
        }
    }
}

impl From<ProfileFields> for UserProfile {
    fn from(f: ProfileFields) -> Self {
        Self {
            name: f.name,
            age: f.age,
            gender: f.gender,
            phone: f.phone,
            role: f.role,
        }
    }
}
