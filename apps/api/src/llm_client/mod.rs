/// LLM Client — the single point of entry for completion-service calls.
///
/// Speaks the OpenAI-compatible chat-completions protocol (Groq by default).
/// Callers depend on the `CompletionService` trait so the transport can be
/// swapped or mocked; `LlmClient` is the HTTP implementation.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Completion call timed out after {0:?}")]
    Timeout(Duration),
}

/// How the model is asked to shape its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject,
    #[allow(dead_code)]
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One chat-completion request: a model, a response format and the messages.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub response_format: ResponseFormat,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl Completion {
    /// Content of the first choice. Later choices are ignored.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// A chat-completion backend. Shared read-only across requests.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
/// Built once at startup and shared by every request.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_url: String,
    api_key: String,
    max_attempts: u32,
}

impl LlmClient {
    pub fn new(
        api_key: String,
        api_url: String,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_url,
            api_key,
            max_attempts: max_attempts.max(1),
        })
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    /// Retries transport errors, 429 and 5xx with exponential backoff.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = backoff_delay(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: api_error_message(body),
                });
            }

            let completion: Completion = response.json().await?;

            if let Some(usage) = &completion.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(completion);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.max_attempts,
        }))
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1 << (attempt - 1).min(5)))
}

const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Splits an overall call budget across `max_attempts` tries, net of the
/// backoff sleeps between them, so a timed-out attempt still leaves room
/// for the next one.
pub fn attempt_timeout(total: Duration, max_attempts: u32) -> Duration {
    let attempts = max_attempts.max(1);
    let backoff: Duration = (1..attempts).map(backoff_delay).sum();
    (total.saturating_sub(backoff) / attempts).max(MIN_ATTEMPT_TIMEOUT)
}

/// Pulls `error.message` out of a provider error body, falling back to the raw body.
fn api_error_message(body: String) -> String {
    serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Drops a leading `<think>...</think>` block emitted by reasoning models.
pub fn strip_reasoning(text: &str) -> &str {
    let trimmed = text.trim_start();
    if trimmed.starts_with("<think>") {
        if let Some(end) = trimmed.find("</think>") {
            return &trimmed[end + "</think>".len()..];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_reasoning_block() {
        let input = "<think>the user wants json</think>\n{\"a\": 1}";
        assert_eq!(strip_reasoning(input).trim(), "{\"a\": 1}");
        assert_eq!(strip_reasoning("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_reasoning("<think>unterminated"), "<think>unterminated");
    }

    #[test]
    fn test_request_serializes_openai_shape() {
        let request = CompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            response_format: ResponseFormat::JsonObject,
            messages: vec![ChatMessage::user("hi")],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "deepseek-r1-distill-llama-70b",
                "response_format": {"type": "json_object"},
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn test_text_response_format() {
        let value = serde_json::to_value(ResponseFormat::Text).unwrap();
        assert_eq!(value, json!({"type": "text"}));
    }

    #[test]
    fn test_completion_uses_first_choice_only() {
        let completion: Completion = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "first"}},
                {"message": {"role": "assistant", "content": "second"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2}
        }))
        .unwrap();
        assert_eq!(completion.text(), Some("first"));
    }

    #[test]
    fn test_completion_without_choices_has_no_text() {
        let completion: Completion = serde_json::from_value(json!({})).unwrap();
        assert_eq!(completion.text(), None);
    }

    #[test]
    fn test_api_error_message_prefers_provider_message() {
        let body = r#"{"error": {"message": "Invalid API Key", "type": "invalid_request_error"}}"#;
        assert_eq!(api_error_message(body.to_string()), "Invalid API Key");
        assert_eq!(api_error_message("bad gateway".to_string()), "bad gateway");
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn test_completion_tolerates_partial_usage() {
        let completion: Completion = serde_json::from_value(json!({
            "choices": [{"message": {"content": "{}"}}],
            "usage": {"total_tokens": 12}
        }))
        .unwrap();
        assert_eq!(completion.text(), Some("{}"));
        assert_eq!(completion.usage.unwrap().prompt_tokens, 0);
    }

    #[test]
    fn test_attempt_timeout_leaves_room_for_retries() {
        // 30s budget, 3 attempts, 1s + 2s of backoff.
        let per_attempt = attempt_timeout(Duration::from_secs(30), 3);
        assert_eq!(per_attempt, Duration::from_secs(9));
        assert!(per_attempt * 3 + backoff_delay(1) + backoff_delay(2) <= Duration::from_secs(30));

        assert_eq!(
            attempt_timeout(Duration::from_secs(30), 1),
            Duration::from_secs(30)
        );
        assert_eq!(
            attempt_timeout(Duration::from_secs(30), 0),
            Duration::from_secs(30)
        );
        assert_eq!(attempt_timeout(Duration::from_secs(2), 3), MIN_ATTEMPT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let client = LlmClient::new(
            "key".to_string(),
            "http://127.0.0.1:9/v1/chat/completions".to_string(),
            Duration::from_secs(2),
            1,
        )
        .unwrap();
        let request = CompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            response_format: ResponseFormat::JsonObject,
            messages: vec![ChatMessage::user("hi")],
        };
        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
    }
}
