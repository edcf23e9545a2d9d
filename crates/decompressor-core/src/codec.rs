//! Conversion between the archived event blob and [`EventSet`].
//!
//! The recorder stores events as JSON text, zlib-compressed, with every
//! compressed byte mapped to the char of the same code point (U+0000..=U+00FF)
//! so the blob can live inside a JSON string.

use miniz_oxide::deflate::compress_to_vec_zlib;
use miniz_oxide::inflate::{decompress_to_vec, decompress_to_vec_zlib};
use serde_json::Value;

use crate::error::DecodeError;
use crate::types::EventSet;

/// Compression level used by the recorder.
pub const DEFAULT_LEVEL: u8 = 6;

/// Highest level accepted by the encoder.
pub const MAX_LEVEL: u8 = 10;

/// Stateless encoder/decoder for event blobs.
#[derive(Debug, Clone, Copy)]
pub struct BlobCodec {
    level: u8,
}

impl Default for BlobCodec {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }
}

impl BlobCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific compression level, clamped to `0..=MAX_LEVEL`.
    pub fn with_level(level: u8) -> Self {
        Self {
            level: level.min(MAX_LEVEL),
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Restore the event set stored in `blob`.
    ///
    /// Accepts zlib-wrapped and raw DEFLATE streams produced by any encoder.
    pub fn decode(&self, blob: &str) -> Result<EventSet, DecodeError> {
        let compressed = blob_to_bytes(blob)?;
        let raw = inflate(&compressed)?;

        match serde_json::from_slice::<Value>(&raw)? {
            Value::Object(map) => Ok(EventSet::from(map)),
            other => Err(DecodeError::NotAnObject(json_kind(&other))),
        }
    }

    /// Produce a blob that [`BlobCodec::decode`] turns back into `events`.
    ///
    /// The exact bytes depend on the DEFLATE implementation; only the round
    /// trip is stable.
    pub fn encode(&self, events: &EventSet) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(events)?;
        let compressed = compress_to_vec_zlib(&json, self.level);
        Ok(bytes_to_blob(&compressed))
    }
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>, DecodeError> {
    match decompress_to_vec_zlib(compressed) {
        Ok(raw) => Ok(raw),
        Err(zlib_err) => {
            tracing::debug!(status = ?zlib_err.status, "not a zlib stream, trying raw deflate");
            decompress_to_vec(compressed)
                .map_err(|_| DecodeError::Inflate(format!("{:?}", zlib_err.status)))
        }
    }
}

fn blob_to_bytes(blob: &str) -> Result<Vec<u8>, DecodeError> {
    blob.chars()
        .enumerate()
        .map(|(offset, ch)| {
            u8::try_from(u32::from(ch)).map_err(|_| DecodeError::NotBinarySafe { offset, ch })
        })
        .collect()
}

fn bytes_to_blob(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniz_oxide::deflate::compress_to_vec;
    use serde_json::json;

    fn sample_events() -> EventSet {
        let value = json!({
            "rrweb": [{"type": 4, "data": {"href": "https://example.com/", "width": 1280}}],
            "network": [{
                "url": "https://api.example.com/items?page=2&size=10",
                "method": "GET",
                "requestData": "",
                "response": "{\"items\":[1,2,3]}",
                "timestamp": 1700000000123u64,
                "responseTime": 42.5
            }],
            "console": []
        });
        match value {
            Value::Object(map) => EventSet::from(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_round_trip() {
        let codec = BlobCodec::new();
        let events = sample_events();

        let blob = codec.encode(&events).unwrap();
        let decoded = codec.decode(&blob).unwrap();

        assert_eq!(decoded, events);
        let categories: Vec<&str> = decoded.categories().collect();
        assert_eq!(categories, vec!["rrweb", "network", "console"]);
    }

    #[test]
    fn test_round_trip_every_level() {
        let events = sample_events();
        for level in 0..=MAX_LEVEL {
            let codec = BlobCodec::with_level(level);
            let blob = codec.encode(&events).unwrap();
            assert_eq!(codec.decode(&blob).unwrap(), events, "level {}", level);
        }
    }

    #[test]
    fn test_round_trip_non_ascii_content() {
        let mut events = EventSet::new();
        events.insert("network", json!([{"response": "grüße 👋 \u{0000} end"}]));

        let codec = BlobCodec::new();
        let blob = codec.encode(&events).unwrap();
        assert!(blob.chars().all(|c| u32::from(c) <= 0xFF));
        assert_eq!(codec.decode(&blob).unwrap(), events);
    }

    #[test]
    fn test_decode_raw_deflate() {
        let events = sample_events();
        let json = serde_json::to_vec(&events).unwrap();
        let blob = bytes_to_blob(&compress_to_vec(&json, 9));

        assert_eq!(BlobCodec::new().decode(&blob).unwrap(), events);
    }

    #[test]
    fn test_decode_rejects_wide_chars() {
        let err = BlobCodec::new().decode("x\u{0100}y").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::NotBinarySafe { offset: 1, ch: '\u{0100}' }
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        // 0x07 is neither a zlib header nor a valid raw block type
        let err = BlobCodec::new().decode("\u{7}\u{0}garbage").unwrap_err();
        assert!(matches!(err, DecodeError::Inflate(_)));
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let blob = bytes_to_blob(&compress_to_vec_zlib(b"not json {", 6));
        let err = BlobCodec::new().decode(&blob).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_decode_rejects_non_object_payload() {
        let blob = bytes_to_blob(&compress_to_vec_zlib(b"[1,2,3]", 6));
        let err = BlobCodec::new().decode(&blob).unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject("array")));
    }

    #[test]
    fn test_level_is_clamped() {
        assert_eq!(BlobCodec::with_level(42).level(), MAX_LEVEL);
        assert_eq!(BlobCodec::default().level(), DEFAULT_LEVEL);
    }
}
