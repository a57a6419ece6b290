use serde_json::{json, Value};
use tracing::warn;

use super::transport::ProviderRequest;
use super::{Protocol, SYSTEM_PROMPT, TEMPERATURE};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 16384;

/// Anthropic messages API
pub struct AnthropicMessages {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Protocol for AnthropicMessages {
    fn build_request(&self, prompt: &str) -> ProviderRequest {
        ProviderRequest {
            url: format!("{}/v1/messages", self.base_url.trim_end_matches('/')),
            headers: vec![
                ("x-api-key", self.api_key.clone()),
                ("anthropic-version", API_VERSION.to_string()),
            ],
            body: json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "system": SYSTEM_PROMPT,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": TEMPERATURE,
            }),
        }
    }

    fn extract_content(&self, envelope: &Value) -> Result<String, String> {
        if envelope.get("stop_reason").and_then(Value::as_str) == Some("max_tokens") {
            warn!(
                "claude reply was truncated at {} tokens; JSON is likely incomplete",
                MAX_TOKENS
            );
        }

        envelope
            .get("content")
            .and_then(Value::as_array)
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            })
            .and_then(|b| b.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "no text block in content".to_string())
    }
}
