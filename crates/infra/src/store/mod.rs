//! Path-addressed realtime document store abstraction.
//!
//! The store is an external service holding JSON documents in a tree. Each
//! node is addressed by a [`StorePath`] such as `/users/{userId}`.
//!
//! ## Consistency
//!
//! Consistency, durability and conflict resolution are the store's
//! responsibility. This layer performs no optimistic concurrency control: the
//! last writer wins. A write is not guaranteed to be visible in the next
//! subscription event before some external propagation delay.

mod in_memory;
mod path;

pub use in_memory::{InMemoryDocumentStore, StoreOp};
pub use path::StorePath;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use atelier_core::Subscription;

/// Store failure. Backend errors are untyped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("invalid store path: {0}")]
    InvalidPath(String),

    #[error("could not decode stored document: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Realtime document store client.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the value at `path` once. `None` if nothing is stored there.
    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Continuously watch `path`.
    ///
    /// The current value is delivered first, then the new value after every
    /// write at, above or below `path`.
    fn subscribe(&self, path: &StorePath) -> Subscription<Option<Value>>;

    /// Merge `fields` into the object at `path`, creating it if needed.
    ///
    /// Keys not present in `fields` are preserved; a `null` field removes
    /// that key.
    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Remove the value at `path` (and everything below it).
    async fn remove(&self, path: &StorePath) -> Result<(), StoreError>;
}
