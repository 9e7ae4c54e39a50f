use async_trait::async_trait;
use scraper::{ElementRef, Html};
use serde_json::{Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::params::str_input;

/// Strips an HTML document down to its visible text.
pub struct HtmlToTextTool;

#[async_trait]
impl Tool for HtmlToTextTool {
    fn name(&self) -> &str {
        "html_to_text"
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let html = str_input(inputs, "html").unwrap_or_default();
        if html.is_empty() {
            return Ok(ToolOutput::text(""));
        }
        Ok(ToolOutput::text(html_to_text(html)))
    }
}

pub(crate) fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut buf = String::new();
    collect_text(document.root_element(), &mut buf);
    compact_whitespace(&buf)
}

fn collect_text(element: ElementRef, buf: &mut String) {
    match element.value().name() {
        "script" | "style" | "noscript" => return,
        "br" | "p" | "div" | "li" | "tr" => buf.push('\n'),
        _ => {}
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            buf.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, buf);
        }
    }
}

pub(crate) fn compact_whitespace(input: &str) -> String {
    let normalized = input.replace(['\t', '\r'], " ");
    normalized
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
