//! Completion Provider Boundary
//!
//! The external LLM service is reached through the [`CompletionProvider`]
//! trait: one real implementation speaking an OpenAI-compatible Chat
//! Completions API, and mocks in tests. The trait reports failures as
//! already-classified errors so the client's retry loop never inspects
//! transport details itself.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::LlmConfig;
use crate::constants::network as net_constants;
use crate::types::{ClassifiedError, ErrorClassifier, ErrorKind};

/// One logical generation request as seen by the provider
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Filled prompt text; validated non-empty before reaching the provider
    pub prompt: String,
    /// Whether the response should arrive as an incremental stream
    pub streaming: bool,
}

/// Token usage reported by the provider, when available
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Non-streaming provider response.
///
/// `content` is `None` when the provider answered without any choice payload;
/// the client classifies that case. An empty string is a valid completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Raw incremental response units from a streaming completion
pub type ByteStream =
    Pin<Box<dyn Stream<Item = std::result::Result<Vec<u8>, ClassifiedError>> + Send>>;

/// Boundary to the external completion service
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Issue one non-streaming completion call
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ClassifiedError>;

    /// Open one streaming completion call, returning the raw increment stream
    async fn open_stream(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<ByteStream, ClassifiedError>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is reachable
    async fn health_check(&self) -> std::result::Result<bool, ClassifiedError>;
}

// =============================================================================
// OpenAI-compatible HTTP Provider
// =============================================================================

/// Completion provider speaking the OpenAI Chat Completions wire format,
/// with secure API key handling.
pub struct HttpCompletionProvider {
    /// API key stored securely - never exposed in logs or debug output.
    /// `None` means unconfigured; calls then fail with AUTHENTICATION.
    api_key: Option<SecretString>,
    api_base: String,
    model: String,
    temperature: f32,
    max_output_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpCompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCompletionProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl HttpCompletionProvider {
    pub fn new(config: &LlmConfig) -> crate::types::Result<Self> {
        let api_base = Self::validate_endpoint(&config.api_base)?;

        // Missing key does not block construction; first call fails with
        // AUTHENTICATION instead.
        let api_key = config.api_key.clone().map(SecretString::from);
        if api_key.is_none() {
            warn!("no API key configured; generation calls will fail until one is set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                crate::types::DraftError::Config(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            api_key,
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            client,
        })
    }

    /// Validate the endpoint is an absolute http(s) URL, without a trailing
    /// slash so joined paths stay predictable.
    fn validate_endpoint(api_base: &str) -> crate::types::Result<String> {
        let url = Url::parse(api_base)
            .map_err(|e| crate::types::DraftError::Config(format!("invalid api_base: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(crate::types::DraftError::Config(format!(
                "api_base must use http or https, got {}",
                url.scheme()
            )));
        }

        Ok(api_base.trim_end_matches('/').to_string())
    }

    fn bearer_token(&self) -> std::result::Result<&str, ClassifiedError> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| {
                ClassifiedError::new(ErrorKind::Authentication, "API key not configured")
            })
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: self.temperature,
            max_tokens: Some(self.max_output_tokens),
            stream: request.streaming,
        }
    }

    async fn post_completions(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<reqwest::Response, ClassifiedError> {
        let token = self.bearer_token()?;
        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(request);

        debug!(model = %self.model, streaming = request.streaming, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_status(status, &body));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ClassifiedError> {
        let response = self.post_completions(request).await?;

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            ClassifiedError::new(
                ErrorKind::Unknown,
                format!("failed to parse completion response: {e}"),
            )
        })?;

        let usage = parsed.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);

        Ok(CompletionResponse { content, usage })
    }

    async fn open_stream(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<ByteStream, ClassifiedError> {
        let response = self.post_completions(request).await?;

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ErrorClassifier::classify_transport(&e))
        });

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> std::result::Result<bool, ClassifiedError> {
        let url = format!("{}/models", self.api_base);

        let mut builder = self.client.get(&url);
        if let Ok(token) = self.bearer_token() {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        match builder.send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("completion provider is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("provider health check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("provider health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response wire types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_construction_without_key_succeeds() {
        let provider = HttpCompletionProvider::new(&LlmConfig::default()).unwrap();
        assert!(provider.api_key.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_fails_authentication_on_use() {
        let provider = HttpCompletionProvider::new(&LlmConfig::default()).unwrap();
        let request = CompletionRequest {
            prompt: "hello".to_string(),
            streaming: false,
        };

        let err = provider.complete(&request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let bad = LlmConfig {
            api_base: "ftp://example.com".to_string(),
            ..config()
        };
        assert!(HttpCompletionProvider::new(&bad).is_err());

        let garbage = LlmConfig {
            api_base: "not a url".to_string(),
            ..config()
        };
        assert!(HttpCompletionProvider::new(&garbage).is_err());
    }

    #[test]
    fn test_endpoint_trailing_slash_stripped() {
        let cfg = LlmConfig {
            api_base: "https://api.example.com/v1/".to_string(),
            ..config()
        };
        let provider = HttpCompletionProvider::new(&cfg).unwrap();
        assert_eq!(provider.api_base, "https://api.example.com/v1");
    }

    #[test]
    fn test_request_carries_single_user_message() {
        let provider = HttpCompletionProvider::new(&config()).unwrap();
        let wire = provider.build_request(&CompletionRequest {
            prompt: "draft the intro".to_string(),
            streaming: true,
        });

        assert_eq!(wire.messages.len(), 1);
        assert_eq!(wire.messages[0].role, "user");
        assert_eq!(wire.messages[0].content, "draft the intro");
        assert!(wire.stream);
    }

    #[test]
    fn test_response_without_choices_parses() {
        let parsed: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }
}
