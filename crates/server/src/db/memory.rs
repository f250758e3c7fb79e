//! In-process store with Realtime Database semantics.
//!
//! Used by the test suites and for running the server without a database
//! (`FIREBASE_DATABASE_URL=memory:`). Data lives in a single JSON tree and is
//! lost on exit.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{KeyValueStore, StoreError, StoreFuture, StorePath};

#[derive(Default)]
struct Inner {
    tree: RwLock<Value>,
    push_counter: AtomicU64,
    unavailable: AtomicBool,
}

/// Shared in-memory JSON tree. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while set, every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Copy of the whole tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn snapshot(&self) -> Result<Value, StoreError> {
        Ok(self.inner.tree.read().map_err(|_| poisoned())?.clone())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate a push key. Keys sort in creation order, like the real thing.
    fn next_push_key(&self) -> String {
        let n = self.inner.push_counter.fetch_add(1, Ordering::SeqCst);
        let suffix = Uuid::new_v4().simple().to_string();
        format!("-M{n:010}{}", suffix.get(..8).unwrap_or_default())
    }

    fn get_sync(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        let tree = self.inner.tree.read().map_err(|_| poisoned())?;
        let mut node = &*tree;
        for segment in path.segments() {
            match node.get(segment) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok((!node.is_null()).then(|| node.clone()))
    }

    fn put_sync(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.check_available()?;
        if value.is_null() {
            return self.remove_sync(path);
        }

        let mut tree = self.inner.tree.write().map_err(|_| poisoned())?;
        let mut node = &mut *tree;
        for segment in path.segments() {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = match node {
                Value::Object(map) => map.entry(segment.clone()).or_insert(Value::Null),
                other => other,
            };
        }
        *node = value;
        Ok(())
    }

    fn remove_sync(&self, path: &StorePath) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tree = self.inner.tree.write().map_err(|_| poisoned())?;
        match path.segments().split_first() {
            None => *tree = Value::Null,
            Some((first, rest)) => {
                remove_in(&mut tree, first, rest);
            }
        }
        Ok(())
    }
}

/// Remove `first/rest...` below `node`, pruning parents left empty.
///
/// Returns whether `node` itself became empty.
fn remove_in(node: &mut Value, first: &str, rest: &[String]) -> bool {
    let Value::Object(map) = node else {
        return false;
    };
    match rest.split_first() {
        None => {
            map.remove(first);
        }
        Some((next, rest)) => {
            if let Some(child) = map.get_mut(first) {
                if remove_in(child, next, rest) {
                    map.remove(first);
                }
            }
        }
    }
    map.is_empty()
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, path: &'a StorePath) -> StoreFuture<'a, Option<Value>> {
        futures::future::ready(self.get_sync(path)).boxed()
    }

    fn put<'a>(&'a self, path: &'a StorePath, value: Value) -> StoreFuture<'a, ()> {
        futures::future::ready(self.put_sync(path, value)).boxed()
    }

    fn push<'a>(&'a self, path: &'a StorePath, value: Value) -> StoreFuture<'a, String> {
        let result = self.check_available().and_then(|()| {
            let key = self.next_push_key();
            self.put_sync(&path.child(&key), value)?;
            Ok(key)
        });
        futures::future::ready(result).boxed()
    }

    fn remove<'a>(&'a self, path: &'a StorePath) -> StoreFuture<'a, ()> {
        futures::future::ready(self.remove_sync(path)).boxed()
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        futures::future::ready(self.check_available()).boxed()
    }
}
