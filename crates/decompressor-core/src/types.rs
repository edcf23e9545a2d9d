use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category holding the recorded page interactions (rrweb stream).
pub const INTERACTION_CATEGORY: &str = "rrweb";

/// Category holding captured network traffic.
pub const NETWORK_CATEGORY: &str = "network";

/// Decoded events of one session, keyed by category name.
///
/// Categories are optional: a missing key means the recorder captured no data
/// of that kind. Key order is preserved from the decoded payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSet(Map<String, Value>);

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: &str) -> Option<&Value> {
        self.0.get(category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains_key(category)
    }

    pub fn insert(&mut self, category: impl Into<String>, events: Value) -> Option<Value> {
        self.0.insert(category.into(), events)
    }

    /// Remove a whole category. Individual events are never edited in place.
    pub fn remove(&mut self, category: &str) -> Option<Value> {
        self.0.shift_remove(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Network events, if the category is present and holds a list.
    pub fn network_events(&self) -> Option<&Vec<Value>> {
        self.0.get(NETWORK_CATEGORY).and_then(Value::as_array)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for EventSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Opaque session attributes (name, recording mode, ...).
///
/// Passed through to the output envelope untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The human-readable session name, when the recorder stored one.
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
