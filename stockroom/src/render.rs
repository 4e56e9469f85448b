//! Terminal output for a chat turn

use std::io::Write;

use serde_json::Value;
use stockroom_agent::{ToolKind, ToolResult, TurnSink};
use stockroom_images::util::format_amount;
use stockroom_llm::ToolCall;

/// Streams assistant text to stdout and tool activity to stderr
#[derive(Debug, Default)]
pub struct Terminal {
    wrote_text: bool,
}

impl Terminal {
    /// End the current reply line
    pub fn finish_reply(&mut self) {
        if self.wrote_text {
            println!();
            self.wrote_text = false;
        }
    }
}

impl TurnSink for Terminal {
    fn text(&mut self, delta: &str) {
        let mut stdout = std::io::stdout().lock();
        if stdout.write_all(delta.as_bytes()).and_then(|()| stdout.flush()).is_ok() {
            self.wrote_text = true;
        }
    }

    fn tool_call(&mut self, call: &ToolCall) {
        self.finish_reply();
        eprintln!("[{}]", call.name);
    }

    fn tool_result(&mut self, result: &ToolResult) {
        for line in summarize(result) {
            eprintln!("  {line}");
        }
    }
}

/// Human-readable lines describing a tool result
pub fn summarize(result: &ToolResult) -> Vec<String> {
    if result.is_error {
        let error = result.payload["error"].as_str().unwrap_or("failed");
        return vec![format!("error: {error}")];
    }

    match ToolKind::from_name(&result.name) {
        Some(ToolKind::SearchImages) => search_lines(&result.payload),
        Some(ToolKind::ShowHistory) => history_lines(&result.payload),
        Some(ToolKind::ShowImages) => show_lines(&result.payload),
        Some(ToolKind::PurchaseImages) => purchase_lines(&result.payload),
        None => Vec::new(),
    }
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or_default()
}

fn search_lines(payload: &Value) -> Vec<String> {
    let mut lines = vec![format!(
        "{} results for \"{}\" (page {} of {})",
        payload["result_count"],
        text(payload, "phrase"),
        payload["page"],
        payload["total_pages"]
    )];

    for image in payload["images"].as_array().into_iter().flatten() {
        let cheapest = image["download_sizes"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|size| size["amount"].as_u64())
            .min();

        lines.push(match cheapest {
            Some(amount) => format!(
                "{}  {}  from {}",
                text(image, "id"),
                text(image, "title"),
                format_amount(amount)
            ),
            None => format!("{}  {}", text(image, "id"), text(image, "title")),
        });
    }

    lines
}

fn history_lines(payload: &Value) -> Vec<String> {
    let items: Vec<String> = payload["history"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| item["attributes"].get("gettyImage"))
        .map(|image| format!("{}  {}  {}", text(image, "id"), text(image, "title"), text(image, "uri")))
        .collect();

    if items.is_empty() {
        vec!["no purchases yet".to_owned()]
    } else {
        items
    }
}

fn show_lines(payload: &Value) -> Vec<String> {
    payload["images"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|image| format!("{}  {}  {}", text(image, "id"), text(image, "title"), text(image, "preview")))
        .collect()
}

fn purchase_lines(payload: &Value) -> Vec<String> {
    payload
        .as_array()
        .into_iter()
        .flatten()
        .map(|outcome| {
            if outcome["success"].as_bool() == Some(true) {
                let data = &outcome["partialData"];
                format!("{}  purchased  {}  {}", text(outcome, "id"), text(data, "title"), text(data, "uri"))
            } else {
                format!("{}  failed  {}", text(outcome, "id"), text(outcome, "error"))
            }
        })
        .collect()
}
