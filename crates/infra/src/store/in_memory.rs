//! In-memory document store for tests/dev.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use atelier_core::{Fanout, Subscription};

use super::{DocumentStore, StoreError, StorePath};

/// Operations that can be made to fail with [`InMemoryDocumentStore::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Read,
    Update,
    Remove,
}

#[derive(Debug, Default)]
struct Tree {
    root: Map<String, Value>,
    failures: HashMap<StoreOp, StoreError>,
    reads: usize,
    writes: usize,
}

impl Tree {
    fn get(&self, path: &StorePath) -> Option<Value> {
        let Some((first, rest)) = path.segments().split_first() else {
            return (!self.root.is_empty()).then(|| Value::Object(self.root.clone()));
        };
        let mut node = self.root.get(first)?;
        for segment in rest {
            node = node.as_object()?.get(segment)?;
        }
        Some(node.clone())
    }

    /// Object at `path`, creating (or replacing non-object values with)
    /// empty objects along the way.
    fn object_mut(&mut self, path: &StorePath) -> &mut Map<String, Value> {
        let mut map = &mut self.root;
        for segment in path.segments() {
            let entry = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            map = match entry {
                Value::Object(inner) => inner,
                _ => unreachable!("replaced with an object above"),
            };
        }
        map
    }

    fn remove(&mut self, path: &StorePath) {
        let Some((last, parents)) = path.segments().split_last() else {
            self.root.clear();
            return;
        };
        let mut map = &mut self.root;
        for segment in parents {
            match map.get_mut(segment) {
                Some(Value::Object(inner)) => map = inner,
                _ => return,
            }
        }
        map.shift_remove(last);
    }

    /// Drop empty objects from `path` upwards; the tree never stores them.
    fn prune(&mut self, path: &StorePath) {
        let mut current = Some(path.clone());
        while let Some(p) = current {
            if p.is_root() {
                break;
            }
            match self.get(&p) {
                Some(Value::Object(map)) if map.is_empty() => self.remove(&p),
                Some(_) => break,
                None => {}
            }
            current = p.parent();
        }
    }

    fn take_failure(&mut self, op: StoreOp) -> Result<(), StoreError> {
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-memory realtime document store.
///
/// - No IO
/// - Children keep insertion order, like push-ordered keys in a hosted store
/// - Watchers of overlapping paths are notified after every write
/// - Cloning shares the same tree
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    tree: Arc<Mutex<Tree>>,
    watchers: Fanout<Option<Value>, StorePath>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tree>, StoreError> {
        self.tree
            .lock()
            .map_err(|_| StoreError::backend("store state poisoned"))
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        if let Ok(mut tree) = self.tree.lock() {
            tree.failures.insert(op, error);
        }
    }

    /// Replace the value at `path` (seeding fixtures).
    pub fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let mut tree = self.lock()?;
        match (path.segments().split_last(), value) {
            (None, Value::Object(map)) => tree.root = map,
            (None, _) => return Err(StoreError::InvalidPath("cannot set a scalar at /".into())),
            (Some(_), Value::Null) => tree.remove(path),
            (Some((last, _)), value) => {
                let parent = path.parent().unwrap_or_default();
                tree.object_mut(&parent).insert(last.clone(), value);
            }
        }
        tree.prune(path);
        tree.writes += 1;
        self.notify(&tree, path);
        Ok(())
    }

    /// Number of `read_once` calls served (including failed ones).
    pub fn read_count(&self) -> usize {
        self.tree.lock().map(|t| t.reads).unwrap_or(0)
    }

    pub fn write_count(&self) -> usize {
        self.tree.lock().map(|t| t.writes).unwrap_or(0)
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.listener_count()
    }

    /// Current value at `path`, bypassing failure injection and counters.
    pub fn snapshot(&self, path: &StorePath) -> Option<Value> {
        self.tree.lock().ok()?.get(path)
    }

    fn notify(&self, tree: &Tree, changed: &StorePath) {
        let delivered = self
            .watchers
            .publish_with(|watched| watched.overlaps(changed).then(|| tree.get(watched)));
        tracing::trace!(path = %changed, delivered, "store change published");
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let mut tree = self.lock()?;
        tree.reads += 1;
        tree.take_failure(StoreOp::Read)?;
        Ok(tree.get(path))
    }

    fn subscribe(&self, path: &StorePath) -> Subscription<Option<Value>> {
        // Hold the tree lock while registering so no write slips in between
        // the initial value and the first change notification.
        match self.tree.lock() {
            Ok(tree) => self.watchers.subscribe_keyed(path.clone(), Some(tree.get(path))),
            Err(_) => self.watchers.subscribe_keyed(path.clone(), None),
        }
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut tree = self.lock()?;
        tree.take_failure(StoreOp::Update)?;

        let target = tree.object_mut(path);
        for (key, value) in fields {
            if value.is_null() {
                target.shift_remove(&key);
            } else {
                target.insert(key, value);
            }
        }
        tree.prune(path);
        tree.writes += 1;
        self.notify(&tree, path);
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        let mut tree = self.lock()?;
        tree.take_failure(StoreOp::Remove)?;

        tree.remove(path);
        tree.prune(path);
        tree.writes += 1;
        self.notify(&tree, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> StorePath {
        StorePath::parse(p).unwrap()
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn update_merges_and_preserves_other_fields() {
        let store = InMemoryDocumentStore::new();
        store
            .update(&path("/users/u1"), fields(json!({ "name": "Ali", "role": "artist" })))
            .await
            .unwrap();
        store
            .update(&path("/users/u1"), fields(json!({ "name": "Ali Raza" })))
            .await
            .unwrap();

        let value = store.read_once(&path("/users/u1")).await.unwrap();
        assert_eq!(value, Some(json!({ "name": "Ali Raza", "role": "artist" })));
    }

    #[tokio::test]
    async fn missing_paths_read_as_none() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(store.read_once(&path("/users/nobody")).await.unwrap(), None);
        assert_eq!(store.read_once(&path("/users")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_prunes_empty_collection() {
        let store = InMemoryDocumentStore::new();
        store
            .update(&path("/users/u1"), fields(json!({ "name": "A" })))
            .await
            .unwrap();
        store.remove(&path("/users/u1")).await.unwrap();

        assert_eq!(store.read_once(&path("/users")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn collection_keeps_insertion_order_after_removal() {
        let store = InMemoryDocumentStore::new();
        for id in ["u1", "u2", "u3"] {
            store
                .update(&path(&format!("/users/{id}")), fields(json!({ "name": id })))
                .await
                .unwrap();
        }
        store.remove(&path("/users/u1")).await.unwrap();

        let users = store.read_once(&path("/users")).await.unwrap().unwrap();
        let keys: Vec<&String> = users.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["u2", "u3"]);
    }

    #[tokio::test]
    async fn watchers_see_current_value_then_changes_below() {
        let store = InMemoryDocumentStore::new();
        let mut users = store.subscribe(&path("/users"));
        let mut unrelated = store.subscribe(&path("/settings"));

        assert_eq!(users.recv().await, Some(None));
        assert_eq!(unrelated.recv().await, Some(None));

        store
            .update(&path("/users/u1"), fields(json!({ "role": "visitor" })))
            .await
            .unwrap();

        assert_eq!(users.recv().await, Some(Some(json!({ "u1": { "role": "visitor" } }))));
        assert_eq!(unrelated.try_recv(), None);
    }

    #[tokio::test]
    async fn injected_failure_applies_once() {
        let store = InMemoryDocumentStore::new();
        store.fail_next(StoreOp::Read, StoreError::backend("permission-denied"));

        assert!(store.read_once(&path("/users/u1")).await.is_err());
        assert!(store.read_once(&path("/users/u1")).await.is_ok());
        assert_eq!(store.read_count(), 2);
    }

    #[test]
    fn set_seeds_fixtures() {
        let store = InMemoryDocumentStore::new();
        store
            .set(&path("/users/u9"), json!({ "name": "Zee", "role": "admin" }))
            .unwrap();
        assert_eq!(
            store.snapshot(&path("/users/u9/role")),
            Some(json!("admin"))
        );
    }
}
