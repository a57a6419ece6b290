use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::extract::clean_json;
use super::retry::{retry_on_invalid, Attempt, RetryError};
use super::transport::{Transport, TransportError};
use super::Protocol;
use crate::config::ProviderName;
use crate::error::AdapterError;
use crate::redact;
use crate::schema::Validate;

const HTTP_BODY_LIMIT: usize = 200;

/// A validated reply from one provider
#[derive(Debug)]
pub struct CallOutcome<T> {
    pub data: T,
    pub provider: ProviderName,
    pub attempts: u32,
    pub duration: Duration,
}

impl<T> CallOutcome<T> {
    pub fn retried(&self) -> bool {
        self.attempts > 1
    }
}

/// One provider behind the uniform call contract: prompt in, validated
/// structure out, with bounded retries on malformed replies.
pub struct Adapter {
    name: ProviderName,
    model: String,
    protocol: Box<dyn Protocol>,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    max_retries: u32,
}

impl Adapter {
    pub fn new(
        name: ProviderName,
        model: String,
        protocol: Box<dyn Protocol>,
        transport: Arc<dyn Transport>,
        timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            name,
            model,
            protocol,
            transport,
            timeout,
            max_retries,
        }
    }

    pub fn name(&self) -> ProviderName {
        self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn call<T>(&self, prompt: &str) -> Result<CallOutcome<T>, AdapterError>
    where
        T: DeserializeOwned + Validate,
    {
        let start = Instant::now();

        let result = retry_on_invalid(self.max_retries, |attempt, last_error| {
            let prompt = match last_error {
                Some(error) => with_correction(prompt, &error),
                None => prompt.to_string(),
            };
            async move { self.attempt::<T>(attempt, &prompt).await }
        })
        .await;

        match result {
            Ok((data, attempts)) => Ok(CallOutcome {
                data,
                provider: self.name,
                attempts,
                duration: start.elapsed(),
            }),
            Err(RetryError::Fatal(e)) => Err(e),
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                warn!(
                    "{}: giving up after {} attempts: {}",
                    self.name, attempts, last_error
                );
                Err(AdapterError::ValidationExhausted {
                    provider: self.name,
                    attempts,
                    last_error,
                })
            }
        }
    }

    async fn attempt<T>(&self, attempt: u32, prompt: &str) -> Result<Attempt<T>, AdapterError>
    where
        T: DeserializeOwned + Validate,
    {
        let request = self.protocol.build_request(prompt);
        let started = Instant::now();

        let response = self
            .transport
            .post(&request, self.timeout)
            .await
            .map_err(|e| match e {
                TransportError::Timeout => AdapterError::Timeout {
                    provider: self.name,
                    after: self.timeout,
                },
                TransportError::Request(message) => AdapterError::Transport {
                    provider: self.name,
                    message,
                },
            })?;

        if !(200..300).contains(&response.status) {
            return Err(AdapterError::Http {
                provider: self.name,
                status: response.status,
                body: truncate(&response.body, HTTP_BODY_LIMIT),
            });
        }

        let envelope: Value =
            serde_json::from_str(&response.body).map_err(|e| AdapterError::Envelope {
                provider: self.name,
                message: format!("response body is not JSON: {}", e),
            })?;

        let raw = self
            .protocol
            .extract_content(&envelope)
            .map_err(|message| AdapterError::Envelope {
                provider: self.name,
                message,
            })?;

        let cleaned = clean_json(&raw);

        info!(
            provider = %self.name,
            attempt,
            raw_len = raw.len(),
            cleaned_len = cleaned.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Received reply"
        );

        let value: Value = match serde_json::from_str(&cleaned) {
            Ok(v) => v,
            Err(e) => {
                let error = format!("invalid JSON: {}", e);
                info!(provider = %self.name, attempt, valid = false, %error, "Reply rejected");
                return Ok(Attempt::Invalid(error));
            }
        };

        let data: T = match serde_json::from_value(value.clone()) {
            Ok(d) => d,
            Err(e) => {
                let error = format!("schema validation failed: {}", e);
                info!(provider = %self.name, attempt, valid = false, %error, "Reply rejected");
                return Ok(Attempt::Invalid(error));
            }
        };

        if let Err(issues) = data.validate() {
            let error = format!("schema validation failed: {}", issues);
            info!(provider = %self.name, attempt, valid = false, %error, "Reply rejected");
            return Ok(Attempt::Invalid(error));
        }

        info!(provider = %self.name, attempt, valid = true, "Reply validated");
        debug!(provider = %self.name, preview = %redact::preview(&value), "Validated reply");

        Ok(Attempt::Valid(data))
    }
}

/// Prompt for a retry, carrying the previous validation error
pub fn with_correction(prompt: &str, error: &str) -> String {
    format!(
        "{}\n\nIMPORTANT: your previous response was invalid. Error: {}. Return ONLY valid JSON matching the required schema.",
        prompt, error
    )
}

fn truncate(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::provider::testing::{openai_adapter, openai_reply, user_prompt, ScriptedTransport};
    use crate::provider::transport::TransportResponse;
    use crate::schema::ProbeReply;

    #[tokio::test]
    async fn test_valid_first_attempt() {
        let transport = ScriptedTransport::sequence(vec![Ok(openai_reply(r#"{"status":"ok"}"#))]);
        let adapter = openai_adapter(ProviderName::Gpt, transport.clone(), 2);

        let outcome = adapter.call::<ProbeReply>("ping").await.unwrap();

        assert_eq!(outcome.data.status, "ok");
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.retried());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_twice_then_valid() {
        let transport = ScriptedTransport::sequence(vec![
            Ok(openai_reply("Sorry, here you go: {\"status\": ")),
            Ok(openai_reply(r#"{"state":"ok"}"#)),
            Ok(openai_reply("```json\n{\"status\":\"ok\"}\n```")),
        ]);
        let adapter = openai_adapter(ProviderName::Mistral, transport.clone(), 2);

        let outcome = adapter.call::<ProbeReply>("ping").await.unwrap();

        assert_eq!(outcome.attempts, 3);
        assert!(outcome.retried());

        let prompts: Vec<String> = transport.requests().iter().map(user_prompt).collect();
        assert_eq!(prompts[0], "ping");
        assert!(prompts[1].starts_with("ping\n\nIMPORTANT: your previous response was invalid. Error: invalid JSON"));
        assert!(prompts[2].contains("schema validation failed"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_rejected_attempts_logged_at_info_with_reason() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = ScriptedTransport::sequence(vec![
            Ok(openai_reply(r#"{"status":"fine"}"#)),
            Ok(openai_reply(r#"{"status":"ok"}"#)),
        ]);
        let adapter = openai_adapter(ProviderName::Llama, transport, 2);
        let outcome = adapter.call::<ProbeReply>("ping").await.unwrap();
        assert_eq!(outcome.attempts, 2);

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let rejected = logs
            .lines()
            .find(|line| line.contains("Reply rejected"))
            .unwrap();
        assert!(rejected.contains("INFO"));
        assert!(rejected.contains("valid=false"));
        assert!(rejected.contains(r#"status: must be "ok""#));
        assert!(logs.lines().any(|l| l.contains("Reply validated") && l.contains("attempt=2")));
        assert!(!logs.contains("preview"));
    }

    #[tokio::test]
    async fn test_validation_exhausted() {
        let transport = ScriptedTransport::repeat(Ok(openai_reply(r#"{"status":"maybe"}"#)));
        let adapter = openai_adapter(ProviderName::Gpt, transport.clone(), 2);

        let err = adapter.call::<ProbeReply>("ping").await.unwrap_err();

        match err {
            AdapterError::ValidationExhausted {
                provider,
                attempts,
                last_error,
            } => {
                assert_eq!(provider, ProviderName::Gpt);
                assert_eq!(attempts, 3);
                assert!(last_error.contains("status"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_http_error_not_retried() {
        let body = "x".repeat(1000);
        let transport = ScriptedTransport::repeat(Ok(TransportResponse {
            status: 429,
            body: body.clone(),
        }));
        let adapter = openai_adapter(ProviderName::Llama, transport.clone(), 2);

        let err = adapter.call::<ProbeReply>("ping").await.unwrap_err();

        match err {
            AdapterError::Http { status, body, .. } => {
                assert_eq!(status, 429);
                assert_eq!(body.len(), HTTP_BODY_LIMIT);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_not_retried() {
        let transport = ScriptedTransport::repeat(Err(TransportError::Timeout));
        let adapter = openai_adapter(ProviderName::Gpt, transport.clone(), 2);

        let err = adapter.call::<ProbeReply>("ping").await.unwrap_err();

        assert!(matches!(err, AdapterError::Timeout { .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_envelope_error_not_retried() {
        let transport = ScriptedTransport::repeat(Ok(TransportResponse {
            status: 200,
            body: r#"{"choices": []}"#.into(),
        }));
        let adapter = openai_adapter(ProviderName::Gpt, transport.clone(), 2);

        let err = adapter.call::<ProbeReply>("ping").await.unwrap_err();

        assert!(matches!(err, AdapterError::Envelope { .. }));
        assert_eq!(transport.calls(), 1);
    }
}
