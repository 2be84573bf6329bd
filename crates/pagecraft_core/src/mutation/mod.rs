//! Change-tracking views over nested JSON containers.
//!
//! A [`NestedMutationDict`] or [`NestedMutationList`] proxies a JSON object or
//! array held in a [`SharedValue`]. Every mutating call, at any depth, invokes
//! one shared change callback exactly once. Reads never notify.
//!
//! Nested containers are wrapped lazily: `get` on a container value returns a
//! fresh view holding the root handle plus the path to that value, so two
//! reads give two views over the same storage. Compound updates are spelled
//! `get` followed by `set`, and only the `set` notifies.
//!
//! A view remembers the epoch of every slot on its path. Replacing, removing,
//! or shifting a slot bumps its epoch, so views read through the old occupant
//! fail with [`AppError::Detached`] instead of following whatever moved in.

mod dict;
mod list;


pub use dict::NestedMutationDict;
pub use list::NestedMutationList;

use crate::error::{AppError, AppResult};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Caller-owned JSON storage shared with the views that track it.
pub type SharedValue = Rc<RefCell<Value>>;

/// Wrap a JSON value in a [`SharedValue`] handle.
pub fn shared(value: Value) -> SharedValue {
    Rc::new(RefCell::new(value))
}

type ChangeCallback = Rc<dyn Fn()>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "[{:?}]", key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// State shared by every view read from the same root view.
#[derive(Default)]
struct Family {
    on_change: RefCell<Option<ChangeCallback>>,
    slot_epochs: RefCell<HashMap<Vec<Segment>, u64>>,
}

impl Family {
    fn epoch(&self, slot: &[Segment]) -> u64 {
        self.slot_epochs.borrow().get(slot).copied().unwrap_or(0)
    }
}

/// Root handle, path, and shared family state behind one view.
#[derive(Clone)]
struct Tracker {
    root: SharedValue,
    path: Rc<[Segment]>,
    /// Epoch of each slot on `path`, captured when the view was created.
    epochs: Rc<[u64]>,
    family: Rc<Family>,
}

impl Tracker {
    fn new(root: SharedValue) -> Self {
        Self {
            root,
            path: Rc::from(Vec::new()),
            epochs: Rc::from(Vec::new()),
            family: Rc::new(Family::default()),
        }
    }

    fn child(&self, segment: Segment) -> Self {
        let mut path = self.path.to_vec();
        path.push(segment);
        let mut epochs = self.epochs.to_vec();
        epochs.push(self.family.epoch(&path));
        Self {
            root: Rc::clone(&self.root),
            path: Rc::from(path),
            epochs: Rc::from(epochs),
            family: Rc::clone(&self.family),
        }
    }

    fn set_on_change(&self, callback: ChangeCallback) {
        *self.family.on_change.borrow_mut() = Some(callback);
    }

    fn notify(&self) {
        // Clone out of the slot so the callback may replace itself.
        let callback = self.family.on_change.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Mark the given children of this view's container as replaced.
    ///
    /// Views read through any of those slots become detached.
    fn invalidate(&self, children: impl IntoIterator<Item = Segment>) {
        let mut slot_epochs = self.family.slot_epochs.borrow_mut();
        for segment in children {
            let mut slot = self.path.to_vec();
            slot.push(segment);
            *slot_epochs.entry(slot).or_insert(0) += 1;
        }
    }

    fn invalidate_indices(&self, indices: std::ops::Range<usize>) {
        self.invalidate(indices.map(Segment::Index));
    }

    fn is_stale(&self) -> bool {
        (1..=self.path.len())
            .any(|depth| self.family.epoch(&self.path[..depth]) != self.epochs[depth - 1])
    }

    fn describe(&self) -> String {
        let mut out = String::from("$");
        for segment in self.path.iter() {
            out.push_str(&segment.to_string());
        }
        out
    }

    fn detached(&self) -> AppError {
        let location = self.describe();
        tracing::warn!("Nested view at {} no longer resolves", location);
        AppError::Detached(location)
    }

    fn read<R>(&self, f: impl FnOnce(&Value) -> AppResult<R>) -> AppResult<R> {
        if self.is_stale() {
            return Err(self.detached());
        }
        let root = self.root.borrow();
        let mut target: &Value = &*root;
        for segment in self.path.iter() {
            target = step(target, segment).ok_or_else(|| self.detached())?;
        }
        f(target)
    }

    /// Apply `f` to the target value and notify once if it succeeds.
    fn mutate<R>(&self, f: impl FnOnce(&mut Value) -> AppResult<R>) -> AppResult<R> {
        if self.is_stale() {
            return Err(self.detached());
        }
        let result = {
            let mut root = self.root.borrow_mut();
            let mut target: &mut Value = &mut *root;
            for segment in self.path.iter() {
                target = match step_mut(target, segment) {
                    Some(next) => next,
                    None => return Err(self.detached()),
                };
            }
            f(target)?
        };
        self.notify();
        Ok(result)
    }
}

fn step<'v>(value: &'v Value, segment: &Segment) -> Option<&'v Value> {
    match (segment, value) {
        (Segment::Key(key), Value::Object(map)) => map.get(key),
        (Segment::Index(index), Value::Array(items)) => items.get(*index),
        _ => None,
    }
}

fn step_mut<'v>(value: &'v mut Value, segment: &Segment) -> Option<&'v mut Value> {
    match (segment, value) {
        (Segment::Key(key), Value::Object(map)) => map.get_mut(key),
        (Segment::Index(index), Value::Array(items)) => items.get_mut(*index),
        _ => None,
    }
}

/// Result of reading through a tracking view.
///
/// Containers come back wrapped so that writes through them still notify.
#[derive(Debug, Clone)]
pub enum Nested {
    Dict(NestedMutationDict),
    List(NestedMutationList),
    Value(Value),
}

impl Nested {
    fn wrap(tracker: Tracker, value: &Value) -> Self {
        match value {
            Value::Object(_) => Nested::Dict(NestedMutationDict::from_tracker(tracker)),
            Value::Array(_) => Nested::List(NestedMutationList::from_tracker(tracker)),
            scalar => Nested::Value(scalar.clone()),
        }
    }

    /// The nested mapping view, if this read hit an object.
    pub fn as_dict(&self) -> Option<&NestedMutationDict> {
        match self {
            Nested::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// The nested sequence view, if this read hit an array.
    pub fn as_list(&self) -> Option<&NestedMutationList> {
        match self {
            Nested::List(list) => Some(list),
            _ => None,
        }
    }

    /// The raw scalar, if this read hit neither an object nor an array.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Nested::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_dict(self) -> Option<NestedMutationDict> {
        match self {
            Nested::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<NestedMutationList> {
        match self {
            Nested::List(list) => Some(list),
            _ => None,
        }
    }

    /// Snapshot of the value this read refers to.
    pub fn to_value(&self) -> AppResult<Value> {
        match self {
            Nested::Dict(dict) => dict.to_value(),
            Nested::List(list) => list.to_value(),
            Nested::Value(value) => Ok(value.clone()),
        }
    }
}

impl PartialEq<Value> for Nested {
    fn eq(&self, other: &Value) -> bool {
        match self {
            Nested::Dict(dict) => dict == other,
            Nested::List(list) => list == other,
            Nested::Value(value) => value == other,
        }
    }
}
