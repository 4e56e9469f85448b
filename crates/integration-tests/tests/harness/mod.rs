#![allow(dead_code)]

pub mod mock_proxy;

use stockroom_config::Config;

/// Configuration pointed at a running mock proxy
pub fn config(base_url: &str) -> Config {
    let raw = format!(
        r#"
        [proxy]
        base_url = "{base_url}"
        api_key = "sk-integration"
        connect_timeout = "2s"

        [llm]
        model = "mock-model"

        [images]
        page_size = 2
        tos_confirmation = true
        user_email = "buyer@example.com"

        [agent]
        max_purchase_without_confirmation = 2
        "#
    );

    Config::parse(&raw).expect("valid test config")
}

/// Render chunks as an event-stream body terminated by the sentinel
pub fn sse(chunks: &[serde_json::Value]) -> String {
    let mut body: String = chunks.iter().map(|chunk| format!("data: {chunk}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}
