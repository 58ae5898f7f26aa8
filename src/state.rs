//! Reactive key/value state.
//!
//! Every mutation goes through [`ReactiveState::set`] or
//! [`ReactiveState::remove`], which commit the change and then run the
//! post-commit hook (notify, then schedule). Reads never run the hook.

use std::sync::Mutex;

use serde_json::{Map, Value};

pub type StateMap = Map<String, Value>;

/// One committed mutation, handed to the post-commit hook.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub prop: String,
    /// `Value::Null` when the key was removed.
    pub value: Value,
    pub old_value: Option<Value>,
}

pub type CommitHook = Box<dyn Fn(StateChange) + Send + Sync>;

pub struct ReactiveState {
    values: Mutex<StateMap>,
    on_commit: CommitHook,
}

impl ReactiveState {
    pub fn new(initial: StateMap, on_commit: CommitHook) -> Self {
        Self {
            values: Mutex::new(initial),
            on_commit,
        }
    }

    /// Seed from an element's JSON snapshot. An absent, malformed or
    /// non-object snapshot yields an empty state.
    pub fn from_snapshot(snapshot: Option<&str>, on_commit: CommitHook) -> Self {
        Self::new(parse_snapshot(snapshot), on_commit)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Shallow copy of every entry as of now.
    pub fn snapshot(&self) -> StateMap {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Assign `value` to `key`, returning the previous value.
    ///
    /// The write is visible to readers before the hook runs; the lock is
    /// not held while the hook executes, so handlers may read or write.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let prop = key.into();
        let value = value.into();
        let old_value = self.lock().insert(prop.clone(), value.clone());
        (self.on_commit)(StateChange {
            prop,
            value,
            old_value: old_value.clone(),
        });
        old_value
    }

    /// Drop `key`. Counts as a mutation (reported with a null value) even
    /// when the key was absent.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let old_value = self.lock().remove(key);
        (self.on_commit)(StateChange {
            prop: key.to_string(),
            value: Value::Null,
            old_value: old_value.clone(),
        });
        old_value
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateMap> {
        self.values.lock().expect("state mutex poisoned")
    }
}

fn parse_snapshot(snapshot: Option<&str>) -> StateMap {
    let Some(raw) = snapshot.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return StateMap::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!(
                kind = json_kind(&other),
                "state snapshot is not an object; starting empty"
            );
            StateMap::new()
        }
        Err(error) => {
            tracing::warn!("malformed state snapshot, starting empty: {error}");
            StateMap::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
