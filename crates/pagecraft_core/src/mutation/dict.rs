//! Mapping variant of the change-tracking view.

use super::{shared, Nested, Segment, SharedValue, Tracker};
use crate::error::{AppError, AppResult};
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;

/// Change-tracking view over a JSON object.
#[derive(Clone)]
pub struct NestedMutationDict {
    tracker: Tracker,
}

impl NestedMutationDict {
    /// Track the object held by `backing`.
    ///
    /// # Errors
    /// [`AppError::NotAContainer`] when `backing` does not hold an object.
    pub fn new(backing: SharedValue) -> AppResult<Self> {
        if !backing.borrow().is_object() {
            return Err(AppError::NotAContainer("object"));
        }
        Ok(Self::from_tracker(Tracker::new(backing)))
    }

    /// Take ownership of `value` and track it.
    pub fn from_value(value: Value) -> AppResult<Self> {
        Self::new(shared(value))
    }

    pub(super) fn from_tracker(tracker: Tracker) -> Self {
        Self { tracker }
    }

    /// Install the callback fired once per mutation.
    ///
    /// The slot is shared with every view read through this one, including
    /// views obtained before the callback was set.
    pub fn set_on_change(&self, callback: impl Fn() + 'static) {
        self.tracker.set_on_change(Rc::new(callback));
    }

    /// Handle to the root storage this view tracks.
    pub fn backing(&self) -> SharedValue {
        Rc::clone(&self.tracker.root)
    }

    fn read_map<R>(&self, f: impl FnOnce(&Map<String, Value>) -> AppResult<R>) -> AppResult<R> {
        self.tracker.read(|value| match value {
            Value::Object(map) => f(map),
            _ => Err(self.tracker.detached()),
        })
    }

    fn mutate_map<R>(
        &self,
        f: impl FnOnce(&mut Map<String, Value>) -> AppResult<R>,
    ) -> AppResult<R> {
        let tracker = &self.tracker;
        tracker.mutate(|value| match value {
            Value::Object(map) => f(map),
            _ => Err(tracker.detached()),
        })
    }

    /// Read `key`, wrapping nested objects and arrays.
    ///
    /// # Errors
    /// [`AppError::KeyNotFound`] when `key` is absent.
    pub fn get(&self, key: &str) -> AppResult<Nested> {
        self.read_map(|map| {
            let value = map
                .get(key)
                .ok_or_else(|| AppError::KeyNotFound(key.to_string()))?;
            Ok(Nested::wrap(
                self.tracker.child(Segment::Key(key.to_string())),
                value,
            ))
        })
    }

    /// Store `value` under `key`.
    ///
    /// Views previously read from `key` are detached.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> AppResult<()> {
        let (key, value) = (key.into(), value.into());
        self.mutate_map(|map| {
            self.tracker.invalidate([Segment::Key(key.clone())]);
            map.insert(key, value);
            Ok(())
        })
    }

    /// Delete `key`, returning the removed value.
    ///
    /// # Errors
    /// [`AppError::KeyNotFound`] when `key` is absent; nothing is notified.
    pub fn remove(&self, key: &str) -> AppResult<Value> {
        self.mutate_map(|map| {
            let removed = map
                .remove(key)
                .ok_or_else(|| AppError::KeyNotFound(key.to_string()))?;
            self.tracker.invalidate([Segment::Key(key.to_string())]);
            Ok(removed)
        })
    }

    /// Remove `key` if present. Notifies only when something was removed.
    pub fn pop(&self, key: &str) -> AppResult<Option<Value>> {
        if !self.contains_key(key)? {
            return Ok(None);
        }
        self.remove(key).map(Some)
    }

    /// Insert `default` under `key` unless present, then read `key`.
    ///
    /// Notifies only when the default was inserted.
    pub fn setdefault(&self, key: &str, default: impl Into<Value>) -> AppResult<Nested> {
        if !self.contains_key(key)? {
            self.set(key, default)?;
        }
        self.get(key)
    }

    /// Insert every pair from `items` with a single notification.
    pub fn update<K, V, I>(&self, items: I) -> AppResult<()>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        // Collected up front: the iterator may read through these views.
        let items: Vec<(String, Value)> = items
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.mutate_map(|map| {
            self.tracker
                .invalidate(items.iter().map(|(key, _)| Segment::Key(key.clone())));
            map.extend(items);
            Ok(())
        })
    }

    /// Remove every entry.
    pub fn clear(&self) -> AppResult<()> {
        self.mutate_map(|map| {
            self.tracker.invalidate(map.keys().cloned().map(Segment::Key));
            map.clear();
            Ok(())
        })
    }

    pub fn contains_key(&self, key: &str) -> AppResult<bool> {
        self.read_map(|map| Ok(map.contains_key(key)))
    }

    pub fn len(&self) -> AppResult<usize> {
        self.read_map(|map| Ok(map.len()))
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        self.read_map(|map| Ok(map.is_empty()))
    }

    /// Keys in map order.
    pub fn keys(&self) -> AppResult<Vec<String>> {
        self.read_map(|map| Ok(map.keys().cloned().collect()))
    }

    /// Snapshot of the tracked object.
    pub fn to_value(&self) -> AppResult<Value> {
        self.read_map(|map| Ok(Value::Object(map.clone())))
    }
}

impl PartialEq<Value> for NestedMutationDict {
    fn eq(&self, other: &Value) -> bool {
        self.read_map(|map| Ok(other.as_object() == Some(map)))
            .unwrap_or(false)
    }
}

impl fmt::Debug for NestedMutationDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedMutationDict")
            .field("path", &self.tracker.describe())
            .field("value", &self.to_value().ok())
            .finish()
    }
}
