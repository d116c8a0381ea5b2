//! Canonical encodings used for hashing.
//!
//! The hash chain is only tamper-evident if append and verify feed the
//! hasher byte-identical material. Both paths — and the evidence packet
//! hasher — go through the two functions here and nowhere else.
//!
//! Canonical JSON: object keys in ascending byte order, arrays in element
//! order, scalars in `serde_json`'s default textual form, no whitespace.
//! Canonical timestamps: RFC 3339 UTC with fixed microsecond precision,
//! e.g. `2026-08-02T14:03:07.000251Z`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Encode a JSON value in the canonical textual form.
///
/// The encoding is a bijection on JSON-equivalent inputs: decoding and
/// re-encoding any output yields the same bytes.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        // serde_json's Display for numbers is already deterministic for a
        // given Number value (integers verbatim, floats via Grisu).
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, &map[key.as_str()]);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    // serde_json's escaping rules, applied through serde_json itself so the
    // two encoders can never drift apart.
    out.push_str(&Value::String(s.to_string()).to_string());
}

/// Encode a timestamp in the canonical textual form used for hashing and
/// for the `created_at` column.
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a canonical timestamp back.
///
/// Accepts any RFC 3339 input; the canonical form is a subset.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
