use serde_json::{json, Value};

use super::transport::ProviderRequest;
use super::{Protocol, SYSTEM_PROMPT, TEMPERATURE};

/// Google generateContent; the key travels in the query string
pub struct GeminiGenerate {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Protocol for GeminiGenerate {
    fn build_request(&self, prompt: &str) -> ProviderRequest {
        ProviderRequest {
            url: format!(
                "{}/v1beta/models/{}:generateContent?key={}",
                self.base_url.trim_end_matches('/'),
                self.model,
                self.api_key
            ),
            headers: Vec::new(),
            body: json!({
                "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                "generationConfig": {
                    "temperature": TEMPERATURE,
                    "responseMimeType": "application/json",
                },
            }),
        }
    }

    fn extract_content(&self, envelope: &Value) -> Result<String, String> {
        let parts = envelope
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .ok_or_else(|| "missing candidates[0].content.parts".to_string())?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();

        if text.is_empty() {
            Err("candidate has no text parts".to_string())
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol() -> GeminiGenerate {
        GeminiGenerate {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: "g-key".into(),
            model: "gemini-2.0-flash".into(),
        }
    }

    #[test]
    fn test_build_request() {
        let request = protocol().build_request("p");
        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=g-key"
        );
        assert!(request.headers.is_empty());
        assert_eq!(
            request.body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(request.body["contents"][0]["parts"][0]["text"], "p");
    }

    #[test]
    fn test_extract_content_joins_parts() {
        let envelope = json!({"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]});
        assert_eq!(protocol().extract_content(&envelope).unwrap(), "{\"a\":1}");
        assert!(protocol().extract_content(&json!({"candidates": []})).is_err());
    }
}
