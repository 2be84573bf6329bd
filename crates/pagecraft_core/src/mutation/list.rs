//! Sequence variant of the change-tracking view.

use super::{shared, Nested, Segment, SharedValue, Tracker};
use crate::error::{AppError, AppResult};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Change-tracking view over a JSON array.
#[derive(Clone)]
pub struct NestedMutationList {
    tracker: Tracker,
}

fn out_of_range(index: usize, len: usize) -> AppError {
    AppError::IndexOutOfRange { index, len }
}

impl NestedMutationList {
    /// Track the array held by `backing`.
    ///
    /// # Errors
    /// [`AppError::NotAContainer`] when `backing` does not hold an array.
    pub fn new(backing: SharedValue) -> AppResult<Self> {
        if !backing.borrow().is_array() {
            return Err(AppError::NotAContainer("array"));
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
    pub fn set_on_change(&self, callback: impl Fn() + 'static) {
        self.tracker.set_on_change(Rc::new(callback));
    }

    /// Handle to the root storage this view tracks.
    pub fn backing(&self) -> SharedValue {
        Rc::clone(&self.tracker.root)
    }

    fn read_items<R>(&self, f: impl FnOnce(&Vec<Value>) -> AppResult<R>) -> AppResult<R> {
        self.tracker.read(|value| match value {
            Value::Array(items) => f(items),
            _ => Err(self.tracker.detached()),
        })
    }

    fn mutate_items<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> AppResult<R>) -> AppResult<R> {
        let tracker = &self.tracker;
        tracker.mutate(|value| match value {
            Value::Array(items) => f(items),
            _ => Err(tracker.detached()),
        })
    }

    /// Read the element at `index`, wrapping nested objects and arrays.
    ///
    /// # Errors
    /// [`AppError::IndexOutOfRange`] when `index >= len`.
    pub fn get(&self, index: usize) -> AppResult<Nested> {
        self.read_items(|items| {
            let value = items
                .get(index)
                .ok_or_else(|| out_of_range(index, items.len()))?;
            Ok(Nested::wrap(
                self.tracker.child(Segment::Index(index)),
                value,
            ))
        })
    }

    /// Replace the element at `index`.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> AppResult<()> {
        let value = value.into();
        self.mutate_items(|items| {
            let len = items.len();
            let slot = items.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
            *slot = value;
            self.tracker.invalidate_indices(index..index + 1);
            Ok(())
        })
    }

    pub fn append(&self, value: impl Into<Value>) -> AppResult<()> {
        let value = value.into();
        self.mutate_items(|items| {
            items.push(value);
            Ok(())
        })
    }

    /// Insert before `index`; `index == len` appends.
    ///
    /// Views read from `index` onward are detached since their elements moved.
    ///
    /// # Errors
    /// [`AppError::IndexOutOfRange`] when `index > len`.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> AppResult<()> {
        let value = value.into();
        self.mutate_items(|items| {
            if index > items.len() {
                return Err(out_of_range(index, items.len()));
            }
            items.insert(index, value);
            self.tracker.invalidate_indices(index..items.len());
            Ok(())
        })
    }

    /// Remove and return the element at `index`.
    ///
    /// Views read from `index` onward are detached.
    ///
    /// # Errors
    /// [`AppError::IndexOutOfRange`] when `index >= len`.
    pub fn delete(&self, index: usize) -> AppResult<Value> {
        self.mutate_items(|items| {
            if index >= items.len() {
                return Err(out_of_range(index, items.len()));
            }
            let len = items.len();
            let removed = items.remove(index);
            self.tracker.invalidate_indices(index..len);
            Ok(removed)
        })
    }

    /// Remove the last element. Notifies only when the list was non-empty.
    pub fn pop(&self) -> AppResult<Option<Value>> {
        if self.is_empty()? {
            return Ok(None);
        }
        self.mutate_items(|items| {
            let popped = items.pop();
            self.tracker.invalidate_indices(items.len()..items.len() + 1);
            Ok(popped)
        })
    }

    /// Append every element of `values` with a single notification.
    pub fn extend<V, I>(&self, values: I) -> AppResult<()>
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        // Collected up front: the iterator may read through these views.
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.mutate_items(|items| {
            items.extend(values);
            Ok(())
        })
    }

    pub fn clear(&self) -> AppResult<()> {
        self.mutate_items(|items| {
            self.tracker.invalidate_indices(0..items.len());
            items.clear();
            Ok(())
        })
    }

    pub fn reverse(&self) -> AppResult<()> {
        self.mutate_items(|items| {
            items.reverse();
            self.tracker.invalidate_indices(0..items.len());
            Ok(())
        })
    }

    pub fn len(&self) -> AppResult<usize> {
        self.read_items(|items| Ok(items.len()))
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        self.read_items(|items| Ok(items.is_empty()))
    }

    /// Snapshot of the tracked array.
    pub fn to_value(&self) -> AppResult<Value> {
        self.read_items(|items| Ok(Value::Array(items.clone())))
    }
}

impl PartialEq<Value> for NestedMutationList {
    fn eq(&self, other: &Value) -> bool {
        self.read_items(|items| Ok(other.as_array() == Some(items)))
            .unwrap_or(false)
    }
}

impl fmt::Debug for NestedMutationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedMutationList")
            .field("path", &self.tracker.describe())
            .field("value", &self.to_value().ok())
            .finish()
    }
}
