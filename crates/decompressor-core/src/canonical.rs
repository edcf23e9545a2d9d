//! Order-independent comparison forms for URLs and JSON-bearing strings.
//!
//! Every function here is total: input that cannot be parsed is passed
//! through unchanged. Two events that differ only in an unparsable variant of
//! a field are therefore not recognized as equal.

use serde_json::{Map, Value};
use url::form_urlencoded;
use url::Url;

/// Outcome of a normalization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized<'a> {
    /// The input parsed and was rewritten into canonical form.
    Canonical(String),
    /// The input could not be parsed and is returned as-is.
    PassThrough(&'a str),
}

impl Normalized<'_> {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Normalized::PassThrough(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Normalized::Canonical(s) => s,
            Normalized::PassThrough(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Normalized::Canonical(s) => s,
            Normalized::PassThrough(s) => s.to_string(),
        }
    }
}

/// Canonical form of `url`: origin and path followed by the query parameters
/// sorted by name. Falls back to `url` when it does not parse.
pub fn normalize_url(url: &str) -> String {
    try_normalize_url(url).into_string()
}

/// Like [`normalize_url`] but reports whether the fallback was taken.
pub fn try_normalize_url(url: &str) -> Normalized<'_> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return Normalized::PassThrough(url),
    };

    let mut params: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    // Stable: repeated names keep their relative order
    params.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut out = parsed.origin().ascii_serialization();
    out.push_str(parsed.path());

    if !params.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&params)
            .finish();
        out.push('?');
        out.push_str(&query);
    }

    Normalized::Canonical(out)
}

/// Canonical form of a JSON document held in a string: compact, with object
/// keys sorted at every depth. Falls back to `text` when it is not JSON.
pub fn normalize_json_text(text: &str) -> String {
    try_normalize_json_text(text).into_string()
}

/// Like [`normalize_json_text`] but reports whether the fallback was taken.
pub fn try_normalize_json_text(text: &str) -> Normalized<'_> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Normalized::Canonical(sort_deep(&value).to_string()),
        Err(_) => Normalized::PassThrough(text),
    }
}

/// Rebuild `value` with the keys of every object in ascending order.
///
/// Arrays keep their element order. Integral floats such as `1.0` or `1e2`
/// become integers so the number form of the source text does not matter;
/// other scalars are copied as they are.
pub fn sort_deep(value: &Value) -> Value {
    match value {
        Value::Number(number) => integral_float(number).unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(sort_deep).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), sort_deep(&map[key]));
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn integral_float(number: &serde_json::Number) -> Option<Value> {
    if !number.is_f64() {
        return None;
    }
    let float = number.as_f64()?;
    if float.fract() != 0.0 || float.abs() > MAX_SAFE_INTEGER {
        return None;
    }
    Some(Value::from(float as i64))
}
