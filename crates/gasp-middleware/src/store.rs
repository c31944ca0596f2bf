//! [`SharedStore`] – free-form key/value stash shared by handlers.
//!
//! Handlers use it to park values that outlive a single event, typically the
//! stop signal of a background task started by one handler and stopped by
//! another.  Each call locks the map once; sequencing several calls on the
//! same key is left to the caller, or done in one call with
//! [`SharedStore::with_or_insert`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

type Slot = Box<dyn Any + Send>;

/// Type-erased, cloneable, thread-safe map.  All clones share one map.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<HashMap<String, Slot>>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`.  Returns `true` if a previous value was
    /// replaced.
    pub fn insert<T: Any + Send>(&self, key: impl Into<String>, value: T) -> bool {
        self.lock().insert(key.into(), Box::new(value)).is_some()
    }

    /// Remove and return the value under `key` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn take<T: Any + Send>(&self, key: &str) -> Option<T> {
        let mut map = self.lock();
        if !map.get(key).is_some_and(|slot| slot.is::<T>()) {
            return None;
        }
        map.remove(key)
            .and_then(|slot| slot.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Run `f` on the value under `key` if it has type `T`.
    ///
    /// `f` runs while the map is locked: calling back into this store (or a
    /// clone of it) from inside `f` deadlocks.
    pub fn with<T: Any + Send, R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut map = self.lock();
        map.get_mut(key)
            .and_then(|slot| slot.downcast_mut::<T>())
            .map(f)
    }

    /// Run `f` on the value under `key`, inserting `init()` first if the key
    /// is absent.  Both steps happen under one lock.
    ///
    /// Returns `None`, without calling `f`, if the key holds another type.
    /// The same locking rule as [`SharedStore::with`] applies to `init` and `f`.
    pub fn with_or_insert<T: Any + Send, R>(
        &self,
        key: impl Into<String>,
        init: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut map = self.lock();
        map.entry(key.into())
            .or_insert_with(|| Box::new(init()))
            .downcast_mut::<T>()
            .map(f)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Drop the value under `key`.  Returns `true` if one existed.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // A panicking handler must not wedge every other handler.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.lock();
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        f.debug_struct("SharedStore").field("keys", &keys).finish()
    }
}
