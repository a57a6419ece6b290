//! In-process transports for tests. Provider base URLs are
//! `http://<name>.test` so a single handler can route by provider.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{
    Adapter, OpenAiChat, ProviderRequest, Transport, TransportError, TransportResponse,
};
use crate::config::{Config, ProviderDirectory, ProviderName};

type Reply = Result<TransportResponse, TransportError>;
type Handler = Box<dyn Fn(&ProviderRequest) -> Reply + Send + Sync>;

pub struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&ProviderRequest) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Replies in order; fails with a transport error once the script runs out
    pub fn sequence(replies: Vec<Reply>) -> Arc<Self> {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Request("script exhausted".into())))
        })
    }

    pub fn repeat(reply: Reply) -> Arc<Self> {
        Self::new(move |_| reply.clone())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, name: ProviderName) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| provider_of(r) == Some(name))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, request: &ProviderRequest, _timeout: Duration) -> Reply {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub fn base_url(name: ProviderName) -> String {
    format!("http://{}.test", name)
}

/// Directory in which exactly `names` hold credentials
pub fn test_directory(names: &[ProviderName]) -> ProviderDirectory {
    let mut config = Config::default();
    for name in ProviderName::ALL {
        let entry = match name {
            ProviderName::Claude => &mut config.providers.claude,
            ProviderName::Gemini => &mut config.providers.gemini,
            ProviderName::Gpt => &mut config.providers.gpt,
            ProviderName::Llama => &mut config.providers.llama,
            ProviderName::Mistral => &mut config.providers.mistral,
        };
        entry.base_url = Some(base_url(name));
        if names.contains(&name) {
            entry.api_key = Some(format!("key-{}", name));
        }
    }
    ProviderDirectory::resolve(&config, |_| None)
}

pub fn openai_adapter(
    name: ProviderName,
    transport: Arc<ScriptedTransport>,
    max_retries: u32,
) -> Adapter {
    Adapter::new(
        name,
        "test-model".into(),
        Box::new(OpenAiChat {
            base_url: base_url(name),
            api_key: "key".into(),
            model: "test-model".into(),
            json_mode: true,
        }),
        transport,
        Duration::from_secs(5),
        max_retries,
    )
}

pub fn provider_of(request: &ProviderRequest) -> Option<ProviderName> {
    ProviderName::ALL
        .into_iter()
        .find(|name| request.url.starts_with(&base_url(*name)))
}

/// Wrap generated text in the envelope the request's protocol expects
pub fn reply_for(request: &ProviderRequest, content: &str) -> Reply {
    let body = if request.url.contains("/v1/messages") {
        json!({"content": [{"type": "text", "text": content}], "stop_reason": "end_turn"})
    } else if request.url.contains(":generateContent") {
        json!({"candidates": [{"content": {"parts": [{"text": content}]}}]})
    } else {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    };
    Ok(TransportResponse {
        status: 200,
        body: body.to_string(),
    })
}

pub fn openai_reply(content: &str) -> TransportResponse {
    TransportResponse {
        status: 200,
        body: json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
            .to_string(),
    }
}

/// The user prompt carried by a request, whatever its protocol
pub fn user_prompt(request: &ProviderRequest) -> String {
    ["/messages/1/content", "/messages/0/content", "/contents/0/parts/0/text"]
        .iter()
        .find_map(|p| request.body.pointer(p).and_then(|v| v.as_str()))
        .unwrap_or_default()
        .to_string()
}
