use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Map, Value};

use baton_config::ToolCaps;
use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::html_to_text::HtmlToTextTool;
use crate::params::{str_input, usize_input};
use crate::pdf_extract::PdfExtractTool;

const TEXT_EXTENSIONS: [&str; 8] = ["txt", "md", "markdown", "csv", "json", "log", "yaml", "yml"];

/// Converts an uploaded file into text: sniffs PDF and HTML and delegates to
/// the dedicated tools, passes plain-text types through, rejects unknown
/// binary payloads.
pub struct FileExtractTool {
    max_bytes: usize,
    pdf: PdfExtractTool,
    html: HtmlToTextTool,
}

impl FileExtractTool {
    pub fn new(caps: &ToolCaps) -> Self {
        Self {
            max_bytes: caps.file_max_bytes,
            pdf: PdfExtractTool::new(caps),
            html: HtmlToTextTool,
        }
    }
}

#[async_trait]
impl Tool for FileExtractTool {
    fn name(&self) -> &str {
        "file_extract"
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let data = str_input(inputs, "data_base64")
            .filter(|d| !d.is_empty())
            .ok_or(ToolError::MissingInput("data_base64"))?;
        let payload = match data.find(',') {
            Some(i) => &data[i + 1..],
            None => data,
        };
        let buf = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ToolError::invalid(format!("invalid base64: {}", e)))?;
        let max_bytes = usize_input(inputs, "max_bytes").unwrap_or(self.max_bytes);
        if buf.len() > max_bytes {
            return Err(ToolError::failed(format!(
                "file too large: {} bytes > limit {}",
                buf.len(),
                max_bytes
            )));
        }

        let filename = str_input(inputs, "filename").unwrap_or_default();
        let content_type = str_input(inputs, "content_type").unwrap_or_default();
        let ext = filename
            .rsplit_once('.')
            .map(|(_, e)| e.to_lowercase())
            .unwrap_or_default();

        if buf.starts_with(b"%PDF-") || ext == "pdf" || content_type.contains("pdf") {
            let mut delegate_inputs = Map::new();
            delegate_inputs.insert("data_base64".to_string(), Value::String(data.to_string()));
            delegate_inputs.insert("max_bytes".to_string(), json!(max_bytes));
            let out = self.pdf.execute(ctx, &delegate_inputs).await?;
            let logs = prepend_log("pdf", &out.logs);
            return Ok(ToolOutput::new(out.output).with_logs(logs));
        }

        let body = String::from_utf8_lossy(&buf).to_string();
        let looks_html = ext == "html"
            || ext == "htm"
            || content_type.contains("html")
            || {
                let lower = body.to_lowercase();
                lower.contains("<html") || lower.contains("<body")
            };
        if looks_html {
            let mut delegate_inputs = Map::new();
            delegate_inputs.insert("html".to_string(), Value::String(body));
            let out = self.html.execute(ctx, &delegate_inputs).await?;
            let logs = prepend_log("html", &out.logs);
            return Ok(ToolOutput::new(out.output).with_logs(logs));
        }

        let plain_type = TEXT_EXTENSIONS.contains(&ext.as_str())
            || content_type.contains("text/")
            || content_type.contains("json")
            || content_type.contains("csv")
            || content_type.contains("yaml");
        if plain_type {
            let text = body.trim().to_string();
            let logs = format!("plain ext={} len={}", ext, text.len());
            return Ok(ToolOutput::text(text).with_logs(logs));
        }

        Err(ToolError::failed(
            "unsupported file type; provide PDF/HTML/text/CSV/JSON/YAML",
        ))
    }
}

fn prepend_log(kind: &str, logs: &str) -> String {
    if logs.is_empty() {
        kind.to_string()
    } else {
        format!("{} {}", kind, logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }

    #[test]
    fn test_plain_text_passthrough() {
        tokio_test::block_on(async {
            let tool = FileExtractTool::new(&ToolCaps::default());
            let inputs = json!({
                "data_base64": encode(b"  hello world  "),
                "filename": "notes.txt"
            });
            let out = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap();
            assert_eq!(out.output, json!("hello world"));
            assert!(out.logs.starts_with("plain ext=txt"));
        });
    }

    #[test]
    fn test_html_is_delegated_by_sniffing() {
        tokio_test::block_on(async {
            let tool = FileExtractTool::new(&ToolCaps::default());
            let inputs = json!({
                "data_base64": encode(b"<html><body><p>inner text</p></body></html>")
            });
            let out = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap();
            assert_eq!(out.output, json!("inner text"));
            assert!(out.logs.starts_with("html"));
        });
    }

    #[test]
    fn test_unknown_binary_is_rejected() {
        tokio_test::block_on(async {
            let tool = FileExtractTool::new(&ToolCaps::default());
            let inputs = json!({
                "data_base64": encode(&[0u8, 159, 146, 150]),
                "filename": "blob.bin"
            });
            let err = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("unsupported file type"));
        });
    }

    #[test]
    fn test_oversized_file_is_rejected() {
        tokio_test::block_on(async {
            let tool = FileExtractTool::new(&ToolCaps::default());
            let inputs = json!({
                "data_base64": encode(&vec![b'a'; 64]),
                "filename": "a.txt",
                "max_bytes": 16
            });
            let err = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("file too large"));
        });
    }

    #[test]
    fn test_pdf_magic_routes_to_pdf_tool() {
        tokio_test::block_on(async {
            let tool = FileExtractTool::new(&ToolCaps::default());
            // Carries the magic but is not a parsable PDF; the error must
            // come from the delegated PDF tool.
            let inputs = json!({"data_base64": encode(b"%PDF-1.4 garbage")});
            let err = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("pdf parse"));
        });
    }
}
