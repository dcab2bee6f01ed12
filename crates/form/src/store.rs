//! Path-addressed mutable value store for one editing session.
//!
//! The store is the single owner of all live form values. Mutations are
//! always path-scoped (no global replace except `reset`), so rapid edits
//! never deep-clone the tree. Subscribers get the affected path after
//! every mutation; the debounce and outline consumers hang off that hook.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Monotonic session generation. Bumped on every `reset`; in-flight async
/// work (debounce fire, upload completion) carries the epoch it was issued
/// against and is discarded on mismatch.
pub type Epoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&str) + Send + Sync>;

pub struct ValueStore {
    template_key: String,
    version: String,
    epoch: Epoch,
    values: BTreeMap<String, Value>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl ValueStore {
    pub fn new(template_key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            template_key: template_key.into(),
            version: version.into(),
            epoch: 0,
            values: BTreeMap::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Seed from persisted instance data: a flat object keyed by path.
    pub fn seed(&mut self, data: &Value) {
        if let Some(object) = data.as_object() {
            for (path, value) in object {
                self.values.insert(path.clone(), value.clone());
            }
        }
    }

    pub fn template_key(&self) -> &str {
        &self.template_key
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Targeted path write.
    pub fn set(&mut self, path: &str, value: Value) {
        self.values.insert(path.to_string(), value);
        self.notify(path);
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let removed = self.values.remove(path);
        if removed.is_some() {
            self.notify(path);
        }
        removed
    }

    /// All stored values at or below `prefix` (the path itself included).
    pub fn paths_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a Value)> {
        let child_prefix = format!("{prefix}.");
        self.values
            .iter()
            .filter(move |(path, _)| *path == prefix || path.starts_with(&child_prefix))
            .map(|(path, value)| (path.as_str(), value))
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Flat JSON snapshot, suitable for a draft's `data` payload.
    pub fn snapshot(&self) -> Value {
        let mut object = Map::new();
        for (path, value) in &self.values {
            object.insert(path.clone(), value.clone());
        }
        Value::Object(object)
    }

    /// Discard all values and retarget the session. The only full-tree
    /// mutation; bumps the epoch so pending async effects become stale.
    pub fn reset(&mut self, template_key: impl Into<String>, version: impl Into<String>) {
        self.template_key = template_key.into();
        self.version = version.into();
        self.values.clear();
        self.epoch += 1;
        self.notify("");
    }

    pub fn subscribe(&mut self, f: impl Fn(&str) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Arc::new(f)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub, _)| *sub != id);
    }

    fn notify(&self, path: &str) {
        for (_, subscriber) in &self.subscribers {
            subscriber(path);
        }
    }
}
