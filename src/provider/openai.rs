use serde_json::{json, Value};

use super::transport::ProviderRequest;
use super::{Protocol, SYSTEM_PROMPT, TEMPERATURE};

/// OpenAI-compatible chat completions, spoken by gpt, mistral and llama
pub struct OpenAiChat {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Ask for `response_format: json_object` (not every host supports it)
    pub json_mode: bool,
}

impl Protocol for OpenAiChat {
    fn build_request(&self, prompt: &str) -> ProviderRequest {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": TEMPERATURE,
        });

        if self.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        ProviderRequest {
            url: format!("{}/chat/completions", self.base_url.trim_end_matches('/')),
            headers: vec![("Authorization", format!("Bearer {}", self.api_key))],
            body,
        }
    }

    fn extract_content(&self, envelope: &Value) -> Result<String, String> {
        envelope
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "missing choices[0].message.content".to_string())
    }
}
