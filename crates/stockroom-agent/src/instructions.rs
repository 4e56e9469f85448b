//! System prompts sent ahead of every conversation

use crate::tools::ToolKind;

/// Default assistant persona
pub const PERSONA: &str = "You are an AI assistant that can help with image searches, purchases, and showing purchase history.";

/// Ground rules appended after the tool instructions
pub const GROUND_RULES: &str = "\
Always respond to the user's request with a text message first before using any tools.
Remember, in all cases, always provide a text response to the user before executing any tool. This ensures clear communication and sets expectations for the user about what actions you're taking.
Also when you display price of the image, you must divide the amount that you get from the JSON data by 1,000,000 and display it as dollars. For example, if the amount is 1000, you should display it as $0.001.";

/// Every tool's usage paragraph, separated by blank lines
pub fn tool_instructions(max_purchase_without_confirmation: usize) -> String {
    ToolKind::ALL
        .iter()
        .map(|tool| tool.instruction(max_purchase_without_confirmation))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The three system messages: persona, tool usage, ground rules
pub fn system_prompts(persona: Option<&str>, max_purchase_without_confirmation: usize) -> Vec<String> {
    vec![
        persona.unwrap_or(PERSONA).to_owned(),
        tool_instructions(max_purchase_without_confirmation),
        GROUND_RULES.to_owned(),
    ]
}
