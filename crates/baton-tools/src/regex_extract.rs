use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::params::{str_input, usize_input};

const DEFAULT_LIMIT: usize = 100;

/// Finds all matches of a pattern in text. With named groups the output is
/// an array of objects; otherwise an array of (full match + groups) arrays.
pub struct RegexExtractTool;

#[async_trait]
impl Tool for RegexExtractTool {
    fn name(&self) -> &str {
        "regex_extract"
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let text = str_input(inputs, "text").unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(ToolOutput::new(json!([])));
        }
        let pattern = str_input(inputs, "pattern")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(ToolError::MissingInput("pattern"))?;

        let prefix = flag_prefix(str_input(inputs, "flags").unwrap_or_default());
        let regex = Regex::new(&format!("{}{}", prefix, pattern))
            .map_err(|e| ToolError::invalid(e.to_string()))?;
        let limit = usize_input(inputs, "limit")
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT);

        let has_named = regex.capture_names().any(|n| n.is_some());
        let rows: Vec<Value> = if has_named {
            regex
                .captures_iter(text)
                .take(limit)
                .map(|caps| {
                    let mut row = Map::new();
                    for name in regex.capture_names().flatten() {
                        if let Some(m) = caps.name(name) {
                            row.insert(name.to_string(), Value::String(m.as_str().to_string()));
                        }
                    }
                    Value::Object(row)
                })
                .collect()
        } else {
            regex
                .captures_iter(text)
                .take(limit)
                .map(|caps| {
                    let groups: Vec<Value> = caps
                        .iter()
                        .map(|m| {
                            Value::String(m.map(|m| m.as_str().to_string()).unwrap_or_default())
                        })
                        .collect();
                    Value::Array(groups)
                })
                .collect()
        };

        Ok(ToolOutput::new(Value::Array(rows)).with_logs(format!("matches<={}", limit)))
    }
}

fn flag_prefix(flags: &str) -> String {
    let flags = flags.to_lowercase();
    let mut enabled = String::new();
    for flag in ['i', 'm', 's'] {
        if flags.contains(flag) {
            enabled.push(flag);
        }
    }
    if enabled.is_empty() {
        String::new()
    } else {
        format!("(?{})", enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(inputs: Value) -> ToolOutput {
        RegexExtractTool
            .execute(&RunContext::new(), inputs.as_object().unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_positional_groups() {
        tokio_test::block_on(async {
            let out = run(json!({"text": "a=1 b=2", "pattern": r"(\w)=(\d)"})).await;
            assert_eq!(
                out.output,
                json!([["a=1", "a", "1"], ["b=2", "b", "2"]])
            );
        });
    }

    #[test]
    fn test_named_groups_produce_objects() {
        tokio_test::block_on(async {
            let out = run(json!({
                "text": "alice:30 bob:41",
                "pattern": r"(?P<name>\w+):(?P<age>\d+)"
            }))
            .await;
            assert_eq!(
                out.output,
                json!([
                    {"name": "alice", "age": "30"},
                    {"name": "bob", "age": "41"}
                ])
            );
        });
    }

    #[test]
    fn test_case_insensitive_flag() {
        tokio_test::block_on(async {
            let out = run(json!({"text": "Foo foo FOO", "pattern": "foo", "flags": "I"})).await;
            assert_eq!(out.output.as_array().unwrap().len(), 3);
        });
    }

    #[test]
    fn test_limit_caps_matches() {
        tokio_test::block_on(async {
            let out = run(json!({"text": "x x x x", "pattern": "x", "limit": 2})).await;
            assert_eq!(out.output.as_array().unwrap().len(), 2);
            assert_eq!(out.logs, "matches<=2");
        });
    }

    #[test]
    fn test_missing_pattern_is_an_error() {
        tokio_test::block_on(async {
            let inputs = json!({"text": "something"});
            let err = RegexExtractTool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::MissingInput("pattern")));
        });
    }

    #[test]
    fn test_empty_text_yields_empty_array() {
        tokio_test::block_on(async {
            let out = run(json!({"text": "", "pattern": "x"})).await;
            assert_eq!(out.output, json!([]));
        });
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        tokio_test::block_on(async {
            let inputs = json!({"text": "x", "pattern": "("});
            let err = RegexExtractTool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::InvalidInput(_)));
        });
    }
}
