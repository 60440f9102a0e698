//! JSON field helpers shared by the frame normalizer.
//!
//! Feed payloads usually carry native JSON numbers, but relayed or replayed
//! frames sometimes encode numbers as strings (`"403456789"`). Every helper
//! here accepts both encodings.

/// Parse a JSON value (string or number) as `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&serde_json::Value>) -> Option<f64> {
    let v = v?;
    let parsed = if let Some(s) = v.as_str() {
        fast_float2::parse(s.trim()).ok()
    } else {
        v.as_f64()
    };
    parsed.filter(|f: &f64| f.is_finite())
}

/// Parse a JSON value (string or number) as `i64`.
#[inline]
pub fn parse_str_i64(v: Option<&serde_json::Value>) -> Option<i64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        s.trim().parse().ok()
    } else {
        v.as_i64()
    }
}

/// Parse a JSON value as a non-empty identifier string.
///
/// Numbers are rendered in decimal; zero and negative numbers are rejected,
/// as are strings that read as zero (`"0"`, `"000"`).
#[inline]
pub fn parse_id(v: Option<&serde_json::Value>) -> Option<String> {
    let v = v?;
    if let Some(s) = v.as_str() {
        let s = s.trim();
        if s.is_empty() || s.parse::<u64>() == Ok(0) {
            return None;
        }
        return Some(s.to_string());
    }
    v.as_u64().filter(|n| *n > 0).map(|n| n.to_string())
}

/// Parse a named field on a JSON object as `f64` (string or number).
#[inline]
pub fn parse_f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    parse_str_f64(v.get(key))
}

/// Parse a named field on a JSON object as `i64` (string or number).
#[inline]
pub fn parse_i64_field(v: &serde_json::Value, key: &str) -> Option<i64> {
    parse_str_i64(v.get(key))
}

/// A named string field, if present.
#[inline]
pub fn str_field<'a>(v: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    v.get(key)?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_and_strings() {
        let v = json!({"a": 12.5, "b": "39.2", "c": "x", "d": 7});
        assert_eq!(parse_f64_field(&v, "a"), Some(12.5));
        assert_eq!(parse_f64_field(&v, "b"), Some(39.2));
        assert_eq!(parse_f64_field(&v, "c"), None);
        assert_eq!(parse_f64_field(&v, "missing"), None);
        assert_eq!(parse_i64_field(&v, "d"), Some(7));
        assert_eq!(parse_i64_field(&v, "a"), None);
    }

    #[test]
    fn identifiers() {
        assert_eq!(parse_id(Some(&json!(403456789))).as_deref(), Some("403456789"));
        assert_eq!(parse_id(Some(&json!(" 403456789 "))).as_deref(), Some("403456789"));
        assert_eq!(parse_id(Some(&json!(0))), None);
        assert_eq!(parse_id(Some(&json!("0"))), None);
        assert_eq!(parse_id(Some(&json!(" 000 "))), None);
        assert_eq!(parse_id(Some(&json!("0403456789"))).as_deref(), Some("0403456789"));
        assert_eq!(parse_id(Some(&json!(""))), None);
        assert_eq!(parse_id(Some(&json!(null))), None);
        assert_eq!(parse_id(None), None);
    }
}
