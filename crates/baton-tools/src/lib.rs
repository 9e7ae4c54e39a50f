//! # Baton Tools
//!
//! The builtin tool set: plain utilities (echo, json_pretty, regex_extract,
//! csv_parse), network fetchers (http_get, http_post_json), document
//! converters (html_to_text, extract_links, pdf_extract, file_extract),
//! LLM-backed tools (summarize, summarize_chunked, llm_answer), and the
//! `call_tool` meta-tool that delegates to any registered tool.

mod call_tool;
mod csv_parse;
mod echo;
mod extract_links;
mod file_extract;
mod html_to_text;
mod http_get;
mod http_post_json;
mod json_pretty;
mod llm_answer;
mod params;
mod pdf_extract;
mod regex_extract;
mod summarize;
mod summarize_chunked;

pub use call_tool::CallTool;
pub use csv_parse::CsvParseTool;
pub use echo::EchoTool;
pub use extract_links::ExtractLinksTool;
pub use file_extract::FileExtractTool;
pub use html_to_text::HtmlToTextTool;
pub use http_get::HttpGetTool;
pub use http_post_json::HttpPostJsonTool;
pub use json_pretty::JsonPrettyTool;
pub use llm_answer::LlmAnswerTool;
pub use pdf_extract::PdfExtractTool;
pub use regex_extract::RegexExtractTool;
pub use summarize::SummarizeTool;
pub use summarize_chunked::SummarizeChunkedTool;

use std::sync::Arc;

use baton_config::ToolCaps;
use baton_core::ToolRegistry;
use baton_providers::LlmClient;

/// Register every builtin tool, including `call_tool`, against a registry.
pub fn register_builtin_tools(
    registry: &Arc<ToolRegistry>,
    caps: &ToolCaps,
    client: Arc<dyn LlmClient>,
) {
    registry.register(Arc::new(EchoTool));
    registry.register(Arc::new(HttpGetTool::new(caps)));
    registry.register(Arc::new(HttpPostJsonTool::new()));
    registry.register(Arc::new(HtmlToTextTool));
    registry.register(Arc::new(ExtractLinksTool));
    registry.register(Arc::new(JsonPrettyTool));
    registry.register(Arc::new(CsvParseTool));
    registry.register(Arc::new(RegexExtractTool));
    registry.register(Arc::new(PdfExtractTool::new(caps)));
    registry.register(Arc::new(FileExtractTool::new(caps)));
    registry.register(Arc::new(SummarizeTool::new(client.clone())));
    registry.register(Arc::new(SummarizeChunkedTool::new(client.clone(), caps)));
    registry.register(Arc::new(LlmAnswerTool::new(client)));
    registry.register(Arc::new(CallTool::new(Arc::downgrade(registry))));
}
