//! Removal of repeated network events.
//!
//! Two events are duplicates when their canonical keys match. The key ignores
//! the volatile timing fields and canonicalizes the URL and JSON body fields,
//! so re-ordered query parameters or re-formatted payloads still collide.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::canonical::{normalize_json_text, normalize_url, sort_deep};

/// Fields that change between otherwise identical requests.
pub const VOLATILE_FIELDS: [&str; 2] = ["timestamp", "responseTime"];

/// Fields holding URLs.
const URL_FIELDS: [&str; 2] = ["url", "responseURL"];

/// Fields holding JSON documents encoded as strings.
const JSON_TEXT_FIELDS: [&str; 2] = ["requestData", "response"];

/// Compute the comparison key of a network event.
///
/// Non-string values in the URL/body fields are kept as they are; every
/// nested object is key-sorted before serialization.
pub fn canonical_key_of(event: &Value) -> String {
    let fields = match event {
        Value::Object(fields) => fields,
        other => return sort_deep(other).to_string(),
    };

    let mut comparable = Map::with_capacity(fields.len());
    for (name, value) in fields {
        if VOLATILE_FIELDS.contains(&name.as_str()) {
            continue;
        }

        let canonical = match value {
            Value::String(text) if URL_FIELDS.contains(&name.as_str()) => {
                Value::String(normalize_url(text))
            }
            Value::String(text) if JSON_TEXT_FIELDS.contains(&name.as_str()) => {
                Value::String(normalize_json_text(text))
            }
            other => other.clone(),
        };
        comparable.insert(name.clone(), canonical);
    }

    sort_deep(&Value::Object(comparable)).to_string()
}

/// Counts reported after a deduplication pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupeStats {
    pub kept: usize,
    pub removed: usize,
}

/// Incremental first-seen filter over network events.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    stats: DedupeStats,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time an event's key is observed.
    pub fn observe(&mut self, event: &Value) -> bool {
        let first = self.seen.insert(canonical_key_of(event));
        if first {
            self.stats.kept += 1;
        } else {
            self.stats.removed += 1;
        }
        first
    }

    pub fn stats(&self) -> DedupeStats {
        self.stats
    }
}

/// Keep the first event of every canonical key, in input order.
pub fn dedupe(events: &[Value]) -> Vec<Value> {
    dedupe_with_stats(events).0
}

/// [`dedupe`] plus the kept/removed counts.
pub fn dedupe_with_stats(events: &[Value]) -> (Vec<Value>, DedupeStats) {
    let mut deduplicator = Deduplicator::new();
    let kept = events
        .iter()
        .filter(|event| deduplicator.observe(event))
        .cloned()
        .collect();
    (kept, deduplicator.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(url: &str, timestamp: u64) -> Value {
        json!({
            "url": url,
            "responseURL": url,
            "method": "POST",
            "status": 200,
            "requestData": "{\"query\":\"shoes\",\"page\":1}",
            "response": "{\"total\":2,\"items\":[{\"id\":1},{\"id\":2}]}",
            "timestamp": timestamp,
            "responseTime": timestamp + 35
        })
    }

    #[test]
    fn test_volatile_fields_ignored() {
        let a = request("https://api.example.com/search?b=2&a=1", 1000);
        let b = request("https://api.example.com/search?b=2&a=1", 9999);
        assert_eq!(canonical_key_of(&a), canonical_key_of(&b));
        assert!(!canonical_key_of(&a).contains("timestamp"));
        assert!(!canonical_key_of(&a).contains("responseTime"));
    }

    #[test]
    fn test_key_ignores_field_and_body_order() {
        let a = json!({
            "method": "GET",
            "url": "http://h/p?x=1&y=2",
            "requestData": "{\"b\":1,\"a\":2}",
            "headers": {"b": "2", "a": "1"}
        });
        let b = json!({
            "headers": {"a": "1", "b": "2"},
            "requestData": "{ \"a\": 2, \"b\": 1 }",
            "url": "http://h/p?y=2&x=1",
            "method": "GET"
        });
        assert_eq!(canonical_key_of(&a), canonical_key_of(&b));
    }

    #[test]
    fn test_key_ignores_number_form_in_bodies() {
        let a = json!({
            "url": "http://h/cart",
            "requestData": "{\"qty\":1.0,\"limit\":1e2}",
            "timestamp": 1
        });
        let b = json!({
            "url": "http://h/cart",
            "requestData": "{\"limit\":100,\"qty\":1}",
            "timestamp": 2
        });
        assert_eq!(canonical_key_of(&a), canonical_key_of(&b));
        assert_eq!(dedupe(&[a.clone(), b]), vec![a]);
    }

    #[test]
    fn test_key_differs_on_identity_fields() {
        let a = request("https://api.example.com/search?a=1", 1);
        let mut b = a.clone();
        b["status"] = json!(500);
        assert_ne!(canonical_key_of(&a), canonical_key_of(&b));
    }

    #[test]
    fn test_missing_and_non_string_fields() {
        let a = json!({"url": null, "response": {"z": 1, "a": 2}});
        let b = json!({"response": {"a": 2, "z": 1}, "url": null});
        assert_eq!(canonical_key_of(&a), canonical_key_of(&b));
        assert_eq!(canonical_key_of(&a), r#"{"response":{"a":2,"z":1},"url":null}"#);
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let a = request("https://api.example.com/search?b=2&a=1", 100);
        let b = request("https://api.example.com/other", 200);
        let a_again = request("https://api.example.com/search?a=1&b=2", 300);

        let (kept, stats) = dedupe_with_stats(&[a.clone(), b.clone(), a_again]);

        assert_eq!(kept, vec![a, b]);
        assert_eq!(stats, DedupeStats { kept: 2, removed: 1 });
    }

    #[test]
    fn test_dedupe_unique_input_unchanged() {
        let events: Vec<Value> = (0..5)
            .map(|i| request(&format!("https://api.example.com/item/{}", i), i))
            .collect();
        assert_eq!(dedupe(&events), events);
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(dedupe(&[]).is_empty());
    }

    #[test]
    fn test_unparsable_url_variants_not_merged() {
        let a = json!({"url": "/relative?b=2&a=1"});
        let b = json!({"url": "/relative?a=1&b=2"});
        assert_eq!(dedupe(&[a.clone(), b.clone()]), vec![a, b]);
    }
}
