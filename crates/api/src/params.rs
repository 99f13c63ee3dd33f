//! Query-parameter parsing.
//!
//! Endpoints declare their fields as spec strings: a leading `-` marks a
//! field optional, a trailing `[]` marks it repeatable (both may be
//! combined). Anything not declared is an error, as is repeating a
//! non-repeatable field or omitting a required one. Value decoding is a
//! separate step so each endpoint can map a bad value to its own error
//! code.

use std::collections::HashMap;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("{field}: required parameter is missing")]
    Missing { field: String },

    #[error("{field}: unknown parameter")]
    Unknown { field: String },

    #[error("{field}: cannot be specified multiple times")]
    Multiple { field: String },

    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ParamError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> ParamError {
        ParamError::Invalid { field: field.to_string(), reason: reason.into() }
    }

    /// The query field that triggered the error.
    pub fn field(&self) -> &str {
        match self {
            ParamError::Missing { field }
            | ParamError::Unknown { field }
            | ParamError::Multiple { field }
            | ParamError::Invalid { field, .. } => field,
        }
    }
}

/// Parsed query parameters, still as raw strings.
#[derive(Debug, Default)]
pub struct QueryParams {
    values: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// Checks raw `key=value` pairs against a field spec list.
    pub fn parse(pairs: &[(String, String)], spec: &[&str]) -> Result<QueryParams, ParamError> {
        let fields: HashMap<&str, (bool, bool)> = spec
            .iter()
            .map(|s| {
                let optional = s.starts_with('-');
                let repeatable = s.ends_with("[]");
                let name = s.trim_start_matches('-').trim_end_matches("[]");
                (name, (optional, repeatable))
            })
            .collect();

        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in pairs {
            let Some(&(_, repeatable)) = fields.get(key.as_str()) else {
                return Err(ParamError::Unknown { field: key.clone() });
            };
            let slot = values.entry(key.clone()).or_default();
            if !repeatable && !slot.is_empty() {
                return Err(ParamError::Multiple { field: key.clone() });
            }
            slot.push(value.clone());
        }

        for (name, &(optional, _)) in &fields {
            if !optional && !values.contains_key(*name) {
                return Err(ParamError::Missing { field: name.to_string() });
            }
        }

        Ok(QueryParams { values })
    }

    /// Single value of a non-repeatable field, `None` when absent.
    pub fn one(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    /// All values of a repeatable field, empty when absent.
    pub fn many(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Decodes a byte field of exactly `length` bytes, given as hex or as
/// base64 (padded or not, standard or URL-safe alphabet).
pub fn decode_bytes(field: &str, value: &str, length: usize) -> Result<Vec<u8>, ParamError> {
    debug_assert!(length >= 5, "short byte fields are ambiguous between hex and base64");

    let hex_len = length * 2;
    let b64_unpadded = (length * 4 + 2) / 3;
    let b64_padded = (length + 2) / 3 * 4;

    if value.len() == hex_len && value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(value)
            .map_err(|_| ParamError::invalid(field, "invalid hex encoding"));
    }

    if value.len() == b64_unpadded || value.len() == b64_padded {
        let standard: String = value
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                c => c,
            })
            .collect();
        let engine = if standard.ends_with('=') { &STANDARD } else { &STANDARD_NO_PAD };
        if let Ok(bytes) = engine.decode(&standard) {
            if bytes.len() == length {
                return Ok(bytes);
            }
        }
    }

    Err(ParamError::invalid(
        field,
        format!("expected {hex_len} hex or {b64_unpadded} base64 characters"),
    ))
}

/// Parses a non-negative integer in `min..=max`. Leading zeros,
/// whitespace and signs are rejected.
pub fn parse_int_field(field: &str, value: &str, min: u64, max: u64) -> Result<u64, ParamError> {
    if value.is_empty()
        || !value.bytes().all(|b| b.is_ascii_digit())
        || (value.len() > 1 && value.starts_with('0'))
    {
        return Err(ParamError::invalid(field, "an integer value is required"));
    }
    let parsed: u64 = value
        .parse()
        .map_err(|_| ParamError::invalid(field, format!("expected an integer between {min} and {max}")))?;
    if parsed < min || parsed > max {
        return Err(ParamError::invalid(
            field,
            format!("expected an integer between {min} and {max}"),
        ));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_required_optional_repeatable() {
        let spec = &["operator", "-contract", "-res_addr[]"];

        let parsed = QueryParams::parse(
            &pairs(&[("operator", "x"), ("res_addr", "a"), ("res_addr", "b")]),
            spec,
        )
        .unwrap();
        assert_eq!(parsed.one("operator"), Some("x"));
        assert_eq!(parsed.one("contract"), None);
        assert_eq!(parsed.many("res_addr"), ["a", "b"]);

        assert_eq!(
            QueryParams::parse(&pairs(&[]), spec).unwrap_err(),
            ParamError::Missing { field: "operator".to_string() }
        );
        assert_eq!(
            QueryParams::parse(&pairs(&[("operator", "x"), ("nope", "1")]), spec).unwrap_err(),
            ParamError::Unknown { field: "nope".to_string() }
        );
        assert_eq!(
            QueryParams::parse(&pairs(&[("operator", "x"), ("operator", "y")]), spec).unwrap_err(),
            ParamError::Multiple { field: "operator".to_string() }
        );
    }

    #[test]
    fn test_decode_bytes_hex() {
        let bytes = decode_bytes("k", &"ab".repeat(32), 32).unwrap();
        assert_eq!(bytes, vec![0xab; 32]);
    }

    #[test]
    fn test_decode_bytes_base64_variants() {
        let raw = vec![0xfbu8; 32];
        let padded = STANDARD.encode(&raw);
        let unpadded = STANDARD_NO_PAD.encode(&raw);
        let urlsafe: String = unpadded.chars().map(|c| if c == '+' { '-' } else if c == '/' { '_' } else { c }).collect();

        assert_eq!(decode_bytes("k", &padded, 32).unwrap(), raw);
        assert_eq!(decode_bytes("k", &unpadded, 32).unwrap(), raw);
        assert_eq!(decode_bytes("k", &urlsafe, 32).unwrap(), raw);
    }

    #[test]
    fn test_decode_bytes_wrong_size() {
        let err = decode_bytes("k", "abcd", 32).unwrap_err();
        assert_eq!(err.field(), "k");
        assert!(err.to_string().contains("64 hex or 43 base64"));
    }

    #[test]
    fn test_parse_int_field() {
        assert_eq!(parse_int_field("fee", "0", 0, 10000).unwrap(), 0);
        assert_eq!(parse_int_field("fee", "10000", 0, 10000).unwrap(), 10000);
        assert!(parse_int_field("fee", "10001", 0, 10000).is_err());
        assert!(parse_int_field("fee", "007", 0, 10000).is_err());
        assert!(parse_int_field("fee", "-1", 0, 10000).is_err());
        assert!(parse_int_field("fee", "", 0, 10000).is_err());
        assert!(parse_int_field("fee", " 5", 0, 10000).is_err());
    }
}
