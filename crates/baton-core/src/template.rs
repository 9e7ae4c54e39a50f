//! Inter-step dataflow: `{{step:ID.output}}` placeholder resolution.
//!
//! Placeholders are replaced with the stringified output of the referenced
//! prior step — string outputs verbatim, anything else as compact JSON.
//! Unknown references resolve to `(missing output from <id>)` and the step
//! still runs with the substituted text.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{step:([A-Za-z0-9_-]+)\.output\}\}").expect("placeholder regex"));

/// Resolve every placeholder in a step's input map against the outputs of
/// prior steps. Nested arrays and objects are traversed; non-string scalars
/// pass through untouched.
pub fn resolve_inputs(
    inputs: &Map<String, Value>,
    outputs: &HashMap<String, Value>,
) -> Map<String, Value> {
    inputs
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, outputs)))
        .collect()
}

/// Resolve placeholders in a single JSON value.
pub fn resolve_value(value: &Value, outputs: &HashMap<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_str(s, outputs)),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, outputs)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, outputs)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_str(input: &str, outputs: &HashMap<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &Captures| {
            let id = &caps[1];
            match outputs.get(id) {
                Some(output) => stringify_output(output),
                None => format!("(missing output from {})", id),
            }
        })
        .into_owned()
}

/// Stringify a step output for substitution: strings verbatim, everything
/// else as compact JSON.
pub fn stringify_output(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
