//! Field access on records: direct keys, dotted paths and `|` composites.

use serde_json::Value;

use crate::conf::N_PATH_SEGMENTS_MAX;
use crate::error::PathDepthError;
use crate::spec::Record;

/// Resolve `path` against `record` for display.
///
/// `a|b` resolves both sub-paths and concatenates them; `a.b.c.d` walks nested
/// mappings (at most four segments). Missing keys resolve to `""`.
pub fn resolve_path(path: &str, record: &Record) -> Result<String, PathDepthError> {
    let mut c_out = String::new();
    for c_sub_path in path.split('|') {
        c_out.push_str(&resolve_single_path(c_sub_path, record)?);
    }
    Ok(c_out)
}

/// Raw display value of column `key`: path access when the key contains `.`
/// or `|`, direct lookup otherwise.
pub fn lookup_raw(key: &str, record: &Record) -> Result<String, PathDepthError> {
    if is_path_key(key) {
        return resolve_path(key, record);
    }
    Ok(record.get(key).map(derive_display_text).unwrap_or_default())
}

/// Raw JSON value of column `key`; path keys yield their resolved text.
pub fn lookup_raw_value(key: &str, record: &Record) -> Result<Value, PathDepthError> {
    if is_path_key(key) {
        return Ok(Value::String(resolve_path(key, record)?));
    }
    Ok(record.get(key).cloned().unwrap_or(Value::Null))
}

/// Dictionary lookup key of column `key`. Integral numbers use their integer
/// text and booleans map to `"1"` / `"0"`, so `1`, `1.0` and `true` all match
/// the entry `"1"`.
pub fn lookup_dictionary_key(key: &str, record: &Record) -> Result<String, PathDepthError> {
    if key.contains('|') {
        return resolve_path(key, record);
    }
    let value = if key.contains('.') {
        find_path_value(key, record)?
    } else {
        record.get(key)
    };
    Ok(value.map(derive_dictionary_key).unwrap_or_default())
}

const N_DICT_KEY_INT_MAX: f64 = 9.0e15;

fn derive_dictionary_key(value: &Value) -> String {
    match value {
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(n_val) if n_val.fract() == 0.0 && n_val.abs() < N_DICT_KEY_INT_MAX => {
                (n_val as i64).to_string()
            }
            _ => n.to_string(),
        },
        _ => derive_display_text(value),
    }
}

fn is_path_key(key: &str) -> bool {
    key.contains('.') || key.contains('|')
}

fn resolve_single_path(path: &str, record: &Record) -> Result<String, PathDepthError> {
    Ok(find_path_value(path, record)?
        .map(derive_display_text)
        .unwrap_or_default())
}

fn find_path_value<'a>(
    path: &str,
    record: &'a Record,
) -> Result<Option<&'a Value>, PathDepthError> {
    let l_segments: Vec<&str> = path.split('.').collect();
    if l_segments.len() > N_PATH_SEGMENTS_MAX {
        return Err(PathDepthError {
            path: path.to_string(),
            depth: l_segments.len(),
            limit: N_PATH_SEGMENTS_MAX,
        });
    }

    let Some((c_head, l_tail)) = l_segments.split_first() else {
        return Ok(None);
    };
    let mut value = match record.get(*c_head) {
        Some(value) => value,
        None => return Ok(None),
    };
    for c_segment in l_tail {
        value = match value {
            Value::Object(map) => match map.get(*c_segment) {
                Some(next) => next,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
    }
    Ok(Some(value))
}

/// Stringify a JSON value for display.
pub fn derive_display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    #[test]
    fn test_resolve_nested_path() {
        let rec = record(json!({"user": {"profile": {"age": 30}}}));
        assert_eq!(resolve_path("user.profile.age", &rec).unwrap(), "30");

        let rec_missing = record(json!({"user": {}}));
        assert_eq!(resolve_path("user.profile.age", &rec_missing).unwrap(), "");
    }

    #[test]
    fn test_resolve_four_segments_and_reject_five() {
        let rec = record(json!({"a": {"b": {"c": {"d": "deep"}}}}));
        assert_eq!(resolve_path("a.b.c.d", &rec).unwrap(), "deep");

        let err = resolve_path("a.b.c.d.e", &rec).unwrap_err();
        assert_eq!(err.depth, 5);
        assert_eq!(err.limit, 4);
    }

    #[test]
    fn test_resolve_piped_paths_concatenate() {
        let rec = record(json!({
            "city": "Paris",
            "user": {"first": "Ada", "last": "Lovelace"}
        }));
        assert_eq!(
            resolve_path("user.first|user.last", &rec).unwrap(),
            "AdaLovelace"
        );
        assert_eq!(resolve_path("missing|city", &rec).unwrap(), "Paris");
    }

    #[test]
    fn test_resolve_through_scalar_is_empty() {
        let rec = record(json!({"user": "plain"}));
        assert_eq!(resolve_path("user.name", &rec).unwrap(), "");
    }

    #[test]
    fn test_lookup_raw_direct_key_and_stringification() {
        let rec = record(json!({"n": 2.5, "b": true, "z": null, "s": "x"}));
        assert_eq!(lookup_raw("n", &rec).unwrap(), "2.5");
        assert_eq!(lookup_raw("b", &rec).unwrap(), "true");
        assert_eq!(lookup_raw("z", &rec).unwrap(), "");
        assert_eq!(lookup_raw("s", &rec).unwrap(), "x");
        assert_eq!(lookup_raw("absent", &rec).unwrap(), "");
    }

    #[test]
    fn test_lookup_raw_value_keeps_json_type_for_plain_keys() {
        let rec = record(json!({"n": 2.5, "user": {"age": 30}}));
        assert_eq!(lookup_raw_value("n", &rec).unwrap(), json!(2.5));
        assert_eq!(lookup_raw_value("absent", &rec).unwrap(), Value::Null);
        assert_eq!(lookup_raw_value("user.age", &rec).unwrap(), json!("30"));
    }

    #[test]
    fn test_dictionary_key_normalizes_integral_numbers_and_bools() {
        let rec = record(json!({
            "f": 1.0,
            "i": 1,
            "r": 2.5,
            "t": true,
            "n": false,
            "s": "1.0",
            "user": {"status": 3.0}
        }));
        assert_eq!(lookup_dictionary_key("f", &rec).unwrap(), "1");
        assert_eq!(lookup_dictionary_key("i", &rec).unwrap(), "1");
        assert_eq!(lookup_dictionary_key("r", &rec).unwrap(), "2.5");
        assert_eq!(lookup_dictionary_key("t", &rec).unwrap(), "1");
        assert_eq!(lookup_dictionary_key("n", &rec).unwrap(), "0");
        assert_eq!(lookup_dictionary_key("s", &rec).unwrap(), "1.0");
        assert_eq!(lookup_dictionary_key("user.status", &rec).unwrap(), "3");
        assert_eq!(lookup_dictionary_key("absent", &rec).unwrap(), "");
        assert!(lookup_dictionary_key("a.b.c.d.e", &rec).is_err());
    }
}
