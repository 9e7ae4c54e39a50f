use async_trait::async_trait;
use serde_json::{json, Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::params::{bool_input, str_input};

/// Converts CSV text into an array of row objects with string values.
/// Ragged rows are tolerated; missing cells become empty strings.
pub struct CsvParseTool;

#[async_trait]
impl Tool for CsvParseTool {
    fn name(&self) -> &str {
        "csv_parse"
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let raw = str_input(inputs, "csv").unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(ToolOutput::new(json!([])));
        }

        let delimiter = match str_input(inputs, "delimiter").filter(|d| !d.is_empty()) {
            Some(d) => {
                let mut chars = d.chars();
                let first = chars.next().unwrap_or(',');
                if chars.next().is_some() || !first.is_ascii() {
                    return Err(ToolError::invalid(
                        "delimiter must be a single character".to_string(),
                    ));
                }
                first as u8
            }
            None => b',',
        };

        // Explicit headers override the first row.
        let mut headers: Vec<String> = inputs
            .get("headers")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let has_header = bool_input(inputs, "has_header").unwrap_or(true);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(raw.as_bytes());

        let mut rows: Vec<Value> = Vec::new();
        let mut first_row = true;
        for record in reader.records() {
            let record = record.map_err(|e| ToolError::invalid(format!("csv: {}", e)))?;
            if first_row && headers.is_empty() && has_header {
                headers = record.iter().map(|f| f.trim().to_string()).collect();
                first_row = false;
                continue;
            }
            first_row = false;
            if headers.is_empty() {
                headers = (1..=record.len()).map(|i| format!("c{}", i)).collect();
            }
            let mut row = Map::new();
            for (i, name) in headers.iter().enumerate() {
                let value = record.get(i).unwrap_or_default();
                row.insert(name.clone(), Value::String(value.to_string()));
            }
            rows.push(Value::Object(row));
        }

        let logs = format!("rows={} cols={}", rows.len(), headers.len());
        Ok(ToolOutput::new(Value::Array(rows)).with_logs(logs))
    }
}
