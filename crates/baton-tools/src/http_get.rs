use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use baton_config::ToolCaps;
use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::params::str_input;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches a URL and returns the body as text, capped at a byte budget.
pub struct HttpGetTool {
    http: reqwest::Client,
    max_bytes: usize,
}

impl HttpGetTool {
    pub fn new(caps: &ToolCaps) -> Self {
        Self {
            http: reqwest::Client::new(),
            max_bytes: caps.http_get_max_bytes,
        }
    }
}

#[async_trait]
impl Tool for HttpGetTool {
    fn name(&self) -> &str {
        "http_get"
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let url = str_input(inputs, "url")
            .filter(|u| !u.is_empty())
            .ok_or(ToolError::MissingInput("url"))?;

        let fetch = async {
            let mut response = self
                .http
                .get(url)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
                .map_err(|e| ToolError::failed(e.to_string()))?;
            let status = response.status().as_u16();
            let mut body: Vec<u8> = Vec::new();
            let mut truncated = false;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| ToolError::failed(e.to_string()))?
            {
                if body.len() + chunk.len() > self.max_bytes {
                    let keep = self.max_bytes - body.len();
                    body.extend_from_slice(&chunk[..keep]);
                    truncated = true;
                    break;
                }
                body.extend_from_slice(&chunk);
            }
            Ok::<_, ToolError>((status, body, truncated))
        };

        let (status, body, truncated) = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(ToolError::Cancelled),
            result = fetch => result?,
        };

        let mut logs = format!("status={}", status);
        if truncated {
            logs.push_str(" truncated=true");
        }
        Ok(ToolOutput::text(String::from_utf8_lossy(&body).to_string()).with_logs(logs))
    }
}
