use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use serde_json::{Map, Value};

use baton_config::ToolCaps;
use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::params::{str_input, usize_input};

/// Extracts text from a base64-encoded PDF, page by page, under byte, page
/// and wall-clock caps. Streams each page through the token sink.
pub struct PdfExtractTool {
    max_bytes: usize,
    max_pages: usize,
    timeout: Duration,
}

impl PdfExtractTool {
    pub fn new(caps: &ToolCaps) -> Self {
        Self {
            max_bytes: caps.pdf_max_bytes,
            max_pages: caps.pdf_max_pages,
            timeout: caps.pdf_timeout,
        }
    }
}

#[async_trait]
impl Tool for PdfExtractTool {
    fn name(&self) -> &str {
        "pdf_extract"
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let data = str_input(inputs, "data_base64")
            .filter(|d| !d.is_empty())
            .ok_or(ToolError::MissingInput("data_base64"))?;
        let max_bytes = usize_input(inputs, "max_bytes").unwrap_or(self.max_bytes);
        let max_pages = usize_input(inputs, "max_pages").unwrap_or(self.max_pages);

        // Accept data: URIs by skipping everything up to the first comma.
        let payload = match data.find(',') {
            Some(i) => &data[i + 1..],
            None => data,
        };
        let buf = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ToolError::invalid(format!("invalid base64: {}", e)))?;
        if buf.len() > max_bytes {
            return Err(ToolError::failed(format!(
                "pdf too large: {} bytes > limit {}",
                buf.len(),
                max_bytes
            )));
        }

        let pages_spec = str_input(inputs, "pages").unwrap_or_default().to_string();
        let deadline = Instant::now() + self.timeout;
        let cancel = ctx.cancel.clone();
        let on_token = ctx.on_token.clone();
        let byte_count = buf.len();

        let (text, selected_count, total_pages) = tokio::task::spawn_blocking(move || {
            let doc = lopdf::Document::load_mem(&buf)
                .map_err(|e| ToolError::failed(format!("pdf parse: {}", e)))?;
            let total_pages = doc.get_pages().len();
            let mut selected = expand_pages(&pages_spec, total_pages);
            if selected.is_empty() {
                selected = (1..=total_pages as u32).collect();
            }
            selected.truncate(max_pages);

            let mut out = String::new();
            for page in &selected {
                if Instant::now() > deadline {
                    return Err(ToolError::failed("pdf extraction timeout"));
                }
                if cancel.is_cancelled() {
                    return Err(ToolError::Cancelled);
                }
                let text = doc.extract_text(&[*page]).unwrap_or_default();
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    if let Some(on_token) = &on_token {
                        on_token(format!("\n\n--- Page {} ---\n{}", page, trimmed));
                    }
                    out.push_str(trimmed);
                    out.push_str("\n\n");
                }
            }
            Ok((out.trim().to_string(), selected.len(), total_pages))
        })
        .await
        .map_err(|e| ToolError::failed(format!("pdf task failed: {}", e)))??;

        let logs = format!(
            "pages={}/{} bytes={}",
            selected_count, total_pages, byte_count
        );
        Ok(ToolOutput::text(text).with_logs(logs))
    }
}

/// Expand a page spec such as `"1-3,7"` into in-bounds page numbers,
/// deduplicated, in spec order.
pub(crate) fn expand_pages(spec: &str, total: usize) -> Vec<u32> {
    let mut out = Vec::new();
    let spec = spec.trim();
    if spec.is_empty() {
        return out;
    }
    let mut add = |n: i64| {
        if n >= 1 && n <= total as i64 {
            let n = n as u32;
            if !out.contains(&n) {
                out.push(n);
            }
        }
    };
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((a, b)) => {
                let a: i64 = a.trim().parse().unwrap_or(0);
                let b: i64 = b.trim().parse().unwrap_or(0);
                let (lo, hi) = if a > b { (b, a) } else { (a, b) };
                for n in lo..=hi {
                    add(n);
                }
            }
            None => add(part.parse().unwrap_or(0)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_pages_ranges_and_singles() {
        assert_eq!(expand_pages("1-3,7", 10), vec![1, 2, 3, 7]);
        assert_eq!(expand_pages("3-1", 10), vec![1, 2, 3]);
        assert_eq!(expand_pages("2,2,2", 10), vec![2]);
        assert_eq!(expand_pages("9-12", 10), vec![9, 10]);
        assert_eq!(expand_pages("", 10), Vec::<u32>::new());
        assert_eq!(expand_pages("0,junk", 10), Vec::<u32>::new());
    }

    #[test]
    fn test_missing_data_is_an_error() {
        tokio_test::block_on(async {
            let tool = PdfExtractTool::new(&ToolCaps::default());
            let err = tool
                .execute(&RunContext::new(), &Map::new())
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::MissingInput("data_base64")));
        });
    }

    #[test]
    fn test_invalid_base64_is_an_error() {
        tokio_test::block_on(async {
            let tool = PdfExtractTool::new(&ToolCaps::default());
            let inputs = json!({"data_base64": "!!not-base64!!"});
            let err = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("invalid base64"));
        });
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        tokio_test::block_on(async {
            let tool = PdfExtractTool::new(&ToolCaps::default());
            let payload = base64::engine::general_purpose::STANDARD.encode(vec![0u8; 64]);
            let inputs = json!({"data_base64": payload, "max_bytes": 16});
            let err = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("pdf too large"));
        });
    }

    #[test]
    fn test_data_uri_prefix_is_stripped() {
        tokio_test::block_on(async {
            let tool = PdfExtractTool::new(&ToolCaps::default());
            // Valid base64 after the comma, but not a valid PDF: the error
            // must come from the parser, not the decoder.
            let inputs = json!({
                "data_base64": format!(
                    "data:application/pdf;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(b"not a pdf")
                )
            });
            let err = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("pdf parse"));
        });
    }
}
