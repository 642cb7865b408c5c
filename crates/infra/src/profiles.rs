//! Typed access to profile records at `/{root}/{userId}`.

use std::sync::Arc;

use serde_json::{Map, Value};

use atelier_core::{ProfileRecord, Subscription, UserId, UserProfile};

use crate::store::{DocumentStore, StoreError, StorePath};

/// Default collection holding one record per user.
pub const DEFAULT_USERS_ROOT: &str = "users";

/// Profile repository over a [`DocumentStore`].
///
/// Each user only ever writes its own record; the collection-wide watch is
/// read-only.
#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn DocumentStore>,
    root: StorePath,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn DocumentStore>, root: StorePath) -> Self {
        Self { store, root }
    }

    /// Repository rooted at `/users`.
    pub fn with_default_root(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(store, StorePath::root().child(DEFAULT_USERS_ROOT))
    }

    pub fn collection_path(&self) -> &StorePath {
        &self.root
    }

    pub fn record_path(&self, user_id: &UserId) -> StorePath {
        self.root.user(user_id)
    }

    /// Read the user's profile once. `None` means the user has not onboarded.
    pub async fn load(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let path = self.record_path(user_id);
        match self.store.read_once(&path).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Decode(format!("{path}: {e}"))),
        }
    }

    /// Merge the profile's fields into the user's record, creating it on
    /// first save. Other keys of the record are left untouched.
    pub async fn save(&self, user_id: &UserId, profile: &UserProfile) -> Result<(), StoreError> {
        let fields = match serde_json::to_value(profile) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(StoreError::Decode(e.to_string())),
        };
        self.store.update(&self.record_path(user_id), fields).await
    }

    pub async fn remove(&self, user_id: &UserId) -> Result<(), StoreError> {
        self.store.remove(&self.record_path(user_id)).await
    }

    /// Watch the whole collection.
    pub fn watch_all(&self) -> Subscription<Option<Value>> {
        self.store.subscribe(&self.root)
    }
}

/// Result of decoding a collection snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedCollection {
    /// Records in store order.
    pub records: Vec<ProfileRecord>,
    /// Keys whose value could not be decoded as a profile.
    pub skipped: Vec<String>,
}

/// Decode a `/users` snapshot into records, keeping store order.
///
/// A missing or null collection decodes as empty. Entries that are not
/// objects, or whose key is not a valid user id, are skipped.
pub fn decode_collection(snapshot: Option<&Value>) -> DecodedCollection {
    let mut decoded = DecodedCollection::default();
    let Some(Value::Object(entries)) = snapshot else {
        return decoded;
    };

    for (key, value) in entries {
        let user_id = match UserId::parse(key.as_str()) {
            Ok(id) => id,
            Err(_) => {
                decoded.skipped.push(key.clone());
                continue;
            }
        };
        if !value.is_object() {
            decoded.skipped.push(key.clone());
            continue;
        }
        match serde_json::from_value::<UserProfile>(value.clone()) {
            Ok(profile) => decoded.records.push(ProfileRecord { user_id, profile }),
            Err(_) => decoded.skipped.push(key.clone()),
        }
    }
    decoded
}
