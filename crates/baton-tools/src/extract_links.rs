use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::params::{str_input, usize_input};

const DEFAULT_MAX_LINKS: usize = 50;

/// Collects anchor hrefs (optionally resolved against a base URL) with
/// their link text.
pub struct ExtractLinksTool;

#[async_trait]
impl Tool for ExtractLinksTool {
    fn name(&self) -> &str {
        "extract_links"
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let html = str_input(inputs, "html").unwrap_or_default();
        if html.trim().is_empty() {
            return Ok(ToolOutput::new(json!([])));
        }
        let max = usize_input(inputs, "max")
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_MAX_LINKS);
        let base = str_input(inputs, "base_url")
            .filter(|b| !b.is_empty())
            .and_then(|b| reqwest::Url::parse(b).ok());

        let selector = Selector::parse("a")
            .map_err(|e| ToolError::failed(format!("anchor selector: {}", e)))?;
        let document = Html::parse_document(html);

        let mut links = Vec::new();
        for anchor in document.select(&selector) {
            if links.len() >= max {
                break;
            }
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() {
                continue;
            }
            let resolved = match &base {
                Some(base) => base
                    .join(href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            };
            let text = anchor
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            links.push(json!({"href": resolved, "text": text}));
        }

        Ok(ToolOutput::new(Value::Array(links)))
    }
}
