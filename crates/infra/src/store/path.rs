use core::str::FromStr;

use atelier_core::UserId;

use super::StoreError;

/// Slash-separated location of a node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse `/a/b/c`. Leading, trailing and repeated slashes are ignored.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let mut segments = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment.contains(['.', '#', '$', '[', ']']) {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// `self` extended by one segment.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// Record path of `user_id` under this collection path.
    pub fn user(&self, user_id: &UserId) -> Self {
        self.child(user_id.as_str())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// Last segment, e.g. the user id of `/users/{id}`.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// True if `self` equals `other` or contains it.
    pub fn contains(&self, other: &StorePath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True if a write at `other` can change the value seen at `self`.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl core::fmt::Display for StorePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for StorePath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_slashes() {
        let path = StorePath::parse("//users/abc/").unwrap();
        assert_eq!(path.to_string(), "/users/abc");
        assert_eq!(path.key(), Some("abc"));
        assert_eq!(StorePath::root().to_string(), "/");
    }

    #[test]
    fn parse_rejects_reserved_characters() {
        assert!(StorePath::parse("/users/a.b").is_err());
        assert!(StorePath::parse("/users/$id").is_err());
    }

    #[test]
    fn overlap_covers_ancestors_and_descendants() {
        let users = StorePath::parse("/users").unwrap();
        let record = users.user(&UserId::parse("u1").unwrap());
        let other = StorePath::parse("/settings").unwrap();

        assert!(users.contains(&record));
        assert!(!record.contains(&users));
        assert!(record.overlaps(&users));
        assert!(!other.overlaps(&record));
        assert!(StorePath::root().contains(&other));
    }
}
