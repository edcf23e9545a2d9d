//! Per-session transformation: archived file text in, export envelope out.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::assembler::{SerializedSession, SessionAssembler};
use crate::codec::BlobCodec;
use crate::dedupe::{dedupe_with_stats, DedupeStats};
use crate::error::SessionError;
use crate::types::{EventSet, Metadata, INTERACTION_CATEGORY, NETWORK_CATEGORY};

/// What to do with a decoded session before it is exported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Drop the recorded-interaction (rrweb) category
    pub strip_interaction_data: bool,
    /// Drop the network category
    pub strip_network_data: bool,
    /// Remove repeated network events before export
    pub deduplicate_network: bool,
    /// Indent the output with four spaces
    pub pretty_print: bool,
    /// Additional categories to drop
    pub strip_categories: Vec<String>,
}

impl ProcessOptions {
    /// Category names to remove, in removal order, without repeats.
    pub fn categories_to_strip(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        if self.strip_interaction_data {
            names.push(INTERACTION_CATEGORY);
        }
        if self.strip_network_data {
            names.push(NETWORK_CATEGORY);
        }
        for name in &self.strip_categories {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}

/// Why a file was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingEvents,
    MissingMetadata,
    EventsNotCompressed,
    EventsAlreadyCompressed,
    MetadataNotObject,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingEvents => write!(f, "no compressed events found"),
            SkipReason::MissingMetadata => write!(f, "no metadata found"),
            SkipReason::EventsNotCompressed => write!(f, "data.events is not a compressed blob"),
            SkipReason::EventsAlreadyCompressed => write!(f, "data.events is already compressed"),
            SkipReason::MetadataNotObject => write!(f, "data.metadata is not an object"),
        }
    }
}

/// Everything the driver needs to report and write a processed session.
#[derive(Debug, Clone)]
pub struct ProcessedSession {
    pub serialized: SerializedSession,
    /// `metadata.name`, when present
    pub name: Option<String>,
    /// Categories present after decoding
    pub categories: Vec<String>,
    /// Categories that were actually removed
    pub stripped: Vec<String>,
    /// Present when network deduplication ran
    pub dedupe: Option<DedupeStats>,
}

#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Processed(ProcessedSession),
    Skipped(SkipReason),
}

fn parse_session(raw_text: &str) -> Result<Value, SessionError> {
    serde_json::from_str(raw_text).map_err(SessionError::InvalidInput)
}

/// Borrow `data.events` and `data.metadata` from a session file, or say why
/// the file should be skipped. Absent, null, empty and `false` values count
/// as missing, and so does a `data` that is not an object.
fn split_session(raw: &Value) -> Result<(&Value, &Map<String, Value>), SkipReason> {
    let data = raw.get("data").and_then(Value::as_object);

    let events = match data.and_then(|data| data.get("events")) {
        Some(value) if is_present(value) => value,
        _ => return Err(SkipReason::MissingEvents),
    };
    let metadata = match data.and_then(|data| data.get("metadata")) {
        Some(Value::Object(map)) => map,
        Some(value) if is_present(value) => return Err(SkipReason::MetadataNotObject),
        _ => return Err(SkipReason::MissingMetadata),
    };

    Ok((events, metadata))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Decode, clean and envelope one archived session.
pub fn process_session(
    raw_text: &str,
    options: &ProcessOptions,
) -> Result<SessionOutcome, SessionError> {
    let raw = parse_session(raw_text)?;
    let (events, metadata) = match split_session(&raw) {
        Ok(parts) => parts,
        Err(reason) => return Ok(SessionOutcome::Skipped(reason)),
    };
    let blob = match events {
        Value::String(blob) => blob,
        _ => return Ok(SessionOutcome::Skipped(SkipReason::EventsNotCompressed)),
    };
    let metadata = Metadata::from(metadata.clone());

    let mut events = BlobCodec::new().decode(blob)?;
    let categories: Vec<String> = events.categories().map(String::from).collect();
    debug!(?categories, "events decoded");

    let strip = options.categories_to_strip();

    let dedupe = if options.deduplicate_network && !strip.contains(&NETWORK_CATEGORY) {
        dedupe_network(&mut events)
    } else {
        None
    };

    let name = metadata.name().map(String::from);
    let mut assembler = SessionAssembler::new();
    assembler.set_metadata(metadata);
    assembler.set_events(events);

    let stripped = strip
        .into_iter()
        .filter(|category| assembler.unset_category(category))
        .map(String::from)
        .collect();

    let mut serialized = assembler.prepare_envelope()?;
    if options.pretty_print {
        serialized = serialized.prettify()?;
    }

    Ok(SessionOutcome::Processed(ProcessedSession {
        serialized,
        name,
        categories,
        stripped,
        dedupe,
    }))
}

/// Replace the network category with its deduplicated form.
fn dedupe_network(events: &mut EventSet) -> Option<DedupeStats> {
    match events.get(NETWORK_CATEGORY) {
        None => None,
        Some(Value::Array(list)) => {
            let (kept, stats) = dedupe_with_stats(list);
            events.insert(NETWORK_CATEGORY, Value::Array(kept));
            Some(stats)
        }
        Some(_) => {
            warn!("network category is not a list, leaving it as is");
            None
        }
    }
}

/// Re-compress the events of an exported session into an archived session
/// that [`process_session`] accepts.
///
/// Files that already carry a compressed blob are skipped.
pub fn pack_session(raw_text: &str, codec: &BlobCodec) -> Result<SessionOutcome, SessionError> {
    let mut raw = parse_session(raw_text)?;
    let (events, metadata) = match split_session(&raw) {
        Ok(parts) => parts,
        Err(reason) => return Ok(SessionOutcome::Skipped(reason)),
    };
    let events = match events {
        Value::Object(map) => EventSet::from(map.clone()),
        _ => return Ok(SessionOutcome::Skipped(SkipReason::EventsAlreadyCompressed)),
    };
    let name = Metadata::from(metadata.clone()).name().map(String::from);

    let categories: Vec<String> = events.categories().map(String::from).collect();
    let blob = codec.encode(&events).map_err(SessionError::Serialize)?;
    raw["data"]["events"] = Value::String(blob);

    let text = serde_json::to_string(&raw).map_err(SessionError::Serialize)?;
    Ok(SessionOutcome::Processed(ProcessedSession {
        serialized: SerializedSession::from_text(text),
        name,
        categories,
        stripped: Vec::new(),
        dedupe: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_to_strip_order_and_dedup() {
        let options = ProcessOptions {
            strip_interaction_data: true,
            strip_network_data: true,
            strip_categories: vec!["console".to_string(), "network".to_string()],
            ..Default::default()
        };
        assert_eq!(options.categories_to_strip(), vec!["rrweb", "network", "console"]);
        assert!(ProcessOptions::default().categories_to_strip().is_empty());
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let options = ProcessOptions::default();
        let cases = [
            (r#"{}"#, SkipReason::MissingEvents),
            (r#"{"data":{"metadata":{"name":"x"}}}"#, SkipReason::MissingEvents),
            (r#"{"data":{"events":"","metadata":{}}}"#, SkipReason::MissingEvents),
            (r#"{"data":{"events":"abc"}}"#, SkipReason::MissingMetadata),
            (r#"{"data":{"events":"abc","metadata":null}}"#, SkipReason::MissingMetadata),
            (r#"{"data":{"events":"abc","metadata":"x"}}"#, SkipReason::MetadataNotObject),
            (r#"{"data":{"events":[1],"metadata":{}}}"#, SkipReason::EventsNotCompressed),
            (r#"{"data":"oops"}"#, SkipReason::MissingEvents),
            (r#"{"data":5}"#, SkipReason::MissingEvents),
            (r#"[1,2]"#, SkipReason::MissingEvents),
            (r#""just a string""#, SkipReason::MissingEvents),
        ];
        for (raw, expected) in cases {
            match process_session(raw, &options).unwrap() {
                SessionOutcome::Skipped(reason) => assert_eq!(reason, expected, "{}", raw),
                SessionOutcome::Processed(_) => panic!("expected skip for {}", raw),
            }
        }
    }

    #[test]
    fn test_invalid_json_input() {
        let err = process_session("not json", &ProcessOptions::default()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));
    }

    #[test]
    fn test_bad_blob_is_decode_error() {
        let raw = r#"{"data":{"events":"\u0007garbage","metadata":{}}}"#;
        let err = process_session(raw, &ProcessOptions::default()).unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
    }
}
