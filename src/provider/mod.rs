mod adapter;
mod anthropic;
mod extract;
mod gemini;
mod openai;
mod registry;
mod retry;
mod transport;

#[cfg(test)]
pub mod testing;

pub use adapter::{with_correction, Adapter, CallOutcome};
pub use anthropic::AnthropicMessages;
pub use gemini::GeminiGenerate;
pub use openai::OpenAiChat;
pub use registry::Registry;
pub use transport::{HttpTransport, ProviderRequest, Transport, TransportError, TransportResponse};

use crate::config::{ProviderDirectory, ProviderName};
use serde_json::Value;

pub const SYSTEM_PROMPT: &str = "You are a contract analysis expert. Always respond with valid JSON only, no markdown and no commentary.";

pub const TEMPERATURE: f64 = 0.2;

/// Wire dialect of one provider: how to build the request and where the
/// generated text sits in the reply envelope.
pub trait Protocol: Send + Sync {
    fn build_request(&self, prompt: &str) -> ProviderRequest;

    fn extract_content(&self, envelope: &Value) -> Result<String, String>;
}

/// Create the protocol for a provider, or `None` when it has no credential
pub fn create_protocol(
    name: ProviderName,
    directory: &ProviderDirectory,
) -> Option<Box<dyn Protocol>> {
    let api_key = directory.api_key(name)?.to_string();
    let base_url = directory.base_url(name).to_string();
    let model = directory.selected_model(name).to_string();

    let protocol: Box<dyn Protocol> = match name {
        ProviderName::Claude => Box::new(AnthropicMessages {
            base_url,
            api_key,
            model,
        }),
        ProviderName::Gemini => Box::new(GeminiGenerate {
            base_url,
            api_key,
            model,
        }),
        ProviderName::Gpt | ProviderName::Mistral => Box::new(OpenAiChat {
            base_url,
            api_key,
            model,
            json_mode: true,
        }),
        ProviderName::Llama => Box::new(OpenAiChat {
            base_url,
            api_key,
            model,
            json_mode: false,
        }),
    };

    Some(protocol)
}
