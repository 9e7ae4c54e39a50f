//! Shared helpers for reading weakly-typed tool inputs.

use serde_json::{Map, Value};

pub(crate) fn str_input<'a>(inputs: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    inputs.get(key).and_then(Value::as_str)
}

/// Accepts a number or a numeric string, like the planner models emit both.
pub(crate) fn usize_input(inputs: &Map<String, Value>, key: &str) -> Option<usize> {
    match inputs.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|v| usize::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts a bool or a number (non-zero is true).
pub(crate) fn bool_input(inputs: &Map<String, Value>, key: &str) -> Option<bool> {
    match inputs.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_usize_input_accepts_number_and_string() {
        let map = inputs(json!({"a": 5, "b": "7", "c": true, "d": -1}));
        assert_eq!(usize_input(&map, "a"), Some(5));
        assert_eq!(usize_input(&map, "b"), Some(7));
        assert_eq!(usize_input(&map, "c"), None);
        assert_eq!(usize_input(&map, "d"), None);
        assert_eq!(usize_input(&map, "missing"), None);
    }

    #[test]
    fn test_bool_input_accepts_bool_and_number() {
        let map = inputs(json!({"a": true, "b": 0, "c": 1.5, "d": "yes"}));
        assert_eq!(bool_input(&map, "a"), Some(true));
        assert_eq!(bool_input(&map, "b"), Some(false));
        assert_eq!(bool_input(&map, "c"), Some(true));
        assert_eq!(bool_input(&map, "d"), None);
    }
}
