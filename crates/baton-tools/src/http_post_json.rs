use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::params::{str_input, usize_input};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_BODY_BYTES: usize = 2 << 20;

/// POSTs a JSON payload and returns the response body as text.
pub struct HttpPostJsonTool {
    http: reqwest::Client,
}

impl HttpPostJsonTool {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpPostJsonTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HttpPostJsonTool {
    fn name(&self) -> &str {
        "http_post_json"
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let raw_url = str_input(inputs, "url")
            .filter(|u| !u.is_empty())
            .ok_or(ToolError::MissingInput("url"))?;
        let url = reqwest::Url::parse(raw_url)
            .map_err(|e| ToolError::invalid(format!("invalid url: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ToolError::invalid(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        // A string payload is sent verbatim; anything else is serialized,
        // including a missing payload (-> "null").
        let body_bytes = match inputs.get("json") {
            Some(Value::String(s)) if !s.is_empty() => s.clone().into_bytes(),
            other => serde_json::to_vec(&other.cloned().unwrap_or(Value::Null))
                .map_err(|e| ToolError::failed(format!("marshal json: {}", e)))?,
        };

        let timeout = usize_input(inputs, "timeout_ms")
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or(DEFAULT_TIMEOUT);

        let mut request = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .body(body_bytes);
        if let Some(headers) = inputs.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(key.as_str(), v);
                }
            }
        }

        let fetch = async {
            let mut response = request
                .send()
                .await
                .map_err(|e| ToolError::failed(e.to_string()))?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let mut body: Vec<u8> = Vec::new();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| ToolError::failed(e.to_string()))?
            {
                if body.len() + chunk.len() > MAX_BODY_BYTES {
                    let keep = MAX_BODY_BYTES - body.len();
                    body.extend_from_slice(&chunk[..keep]);
                    break;
                }
                body.extend_from_slice(&chunk);
            }
            Ok::<_, ToolError>((status, content_type, body))
        };

        let (status, content_type, body) = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(ToolError::Cancelled),
            result = fetch => result?,
        };

        let logs = format!("status={} content_type={}", status, content_type);
        Ok(ToolOutput::text(String::from_utf8_lossy(&body).to_string()).with_logs(logs))
    }
}
