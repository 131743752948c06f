//! Generation Client
//!
//! Issues one logical generation request to the completion provider, applying
//! error classification and bounded retry with exponential backoff. Supports
//! complete-text and incremental-stream response modes.
//!
//! Retries are fully internal: callers see a single final outcome, success or
//! one terminal [`ClassifiedError`]. For streaming calls, retry covers the
//! stream *setup* only; once content has started flowing, a failure is
//! terminal (re-attempting would duplicate fragments the chunk callback
//! already delivered).

use std::sync::Arc;

use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::provider::{
    ByteStream, CompletionProvider, CompletionRequest, HttpCompletionProvider, TokenUsage,
};
use super::retry::{RetryConfig, RetryPolicy, RetryState};
use super::stream::StreamDecoder;
use crate::config::LlmConfig;
use crate::types::{ClassifiedError, ErrorKind};

/// Outcome of one successful generation call
#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    /// Full response text (empty string is a valid completion)
    pub content: String,
    /// Token usage, when the provider reported it
    pub usage: Option<TokenUsage>,
}

/// Client for the external completion provider.
///
/// Holds only configuration and the provider handle - no per-request state -
/// so one instance is safely shared across concurrent callers.
pub struct GenerationClient {
    provider: Arc<dyn CompletionProvider>,
    retry: RetryPolicy,
}

impl GenerationClient {
    /// Construct with the HTTP provider described by `config`
    pub fn new(config: &LlmConfig) -> crate::types::Result<Self> {
        let provider = Arc::new(HttpCompletionProvider::new(config)?);
        let retry = RetryPolicy::new(RetryConfig {
            max_attempts: config.max_attempts,
            base_delay: std::time::Duration::from_millis(config.base_delay_ms),
            ..RetryConfig::default()
        });

        Ok(Self { provider, retry })
    }

    /// Construct over an explicit provider (dependency injection seam)
    pub fn with_provider(provider: Arc<dyn CompletionProvider>, retry: RetryConfig) -> Self {
        Self {
            provider,
            retry: RetryPolicy::new(retry),
        }
    }

    /// Model identifier the underlying provider uses
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Check whether the provider is reachable
    pub async fn health_check(&self) -> std::result::Result<bool, ClassifiedError> {
        self.provider.health_check().await
    }

    /// Generate the complete response text for `prompt`.
    ///
    /// An empty prompt fails immediately with INVALID_REQUEST; no attempt is
    /// consumed. An empty-string payload from the provider is success.
    pub async fn generate_content(
        &self,
        prompt: &str,
    ) -> std::result::Result<GenerationOutput, ClassifiedError> {
        if prompt.trim().is_empty() {
            return Err(ClassifiedError::empty_prompt());
        }

        let request = CompletionRequest {
            prompt: prompt.to_string(),
            streaming: false,
        };
        let mut state = RetryState::default();

        loop {
            self.pace(&mut state).await;

            let error = match self.provider.complete(&request).await {
                Ok(response) => match response.content {
                    Some(content) => {
                        debug!(
                            attempt = state.attempt,
                            chars = content.len(),
                            "Completion succeeded"
                        );
                        return Ok(GenerationOutput {
                            content,
                            usage: response.usage,
                        });
                    }
                    // Response carried no choices at all; distinct from an
                    // empty-string completion, which is success.
                    None => ClassifiedError::new(
                        ErrorKind::Unknown,
                        "provider response contained no choices",
                    ),
                },
                Err(err) => err,
            };

            self.absorb_or_fail(&mut state, error)?;
        }
    }

    /// Generate via the incremental-stream response mode, invoking `on_chunk`
    /// with each text fragment and the cumulative progress estimate.
    ///
    /// The terminal `("", 100)` invocation is always last. On a mid-stream
    /// failure the return value is all-or-nothing: accumulated text is
    /// discarded and the call fails with a STREAM_ERROR-kind error, though
    /// fragments already delivered through `on_chunk` stand.
    pub async fn generate_content_stream(
        &self,
        prompt: &str,
        mut on_chunk: impl FnMut(&str, u8),
    ) -> std::result::Result<GenerationOutput, ClassifiedError> {
        if prompt.trim().is_empty() {
            return Err(ClassifiedError::empty_prompt());
        }

        let request = CompletionRequest {
            prompt: prompt.to_string(),
            streaming: true,
        };

        let mut stream = self.open_stream_with_retry(&request).await?;
        let mut decoder = StreamDecoder::new();
        let mut content = String::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| Self::stream_failure(e, decoder.fragments_seen()))?;

            let fragments = decoder
                .feed(&bytes)
                .map_err(|e| Self::stream_failure(e, decoder.fragments_seen()))?;

            for fragment in fragments {
                content.push_str(&fragment.text);
                on_chunk(&fragment.text, fragment.progress);
            }

            if decoder.is_finished() {
                break;
            }
        }

        let terminal = decoder.finish();
        on_chunk(&terminal.text, terminal.progress);

        debug!(chars = content.len(), "Stream completed");
        Ok(GenerationOutput {
            content,
            usage: None,
        })
    }

    /// Stream setup with the same retry discipline as non-streaming calls
    async fn open_stream_with_retry(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<ByteStream, ClassifiedError> {
        let mut state = RetryState::default();

        loop {
            self.pace(&mut state).await;

            match self.provider.open_stream(request).await {
                Ok(stream) => return Ok(stream),
                Err(err) => self.absorb_or_fail(&mut state, err)?,
            }
        }
    }

    /// Advance the attempt counter, sleeping out the backoff before every
    /// attempt after the first.
    async fn pace(&self, state: &mut RetryState) {
        state.attempt += 1;
        if state.attempt > 1 {
            let delay = self.retry.delay_for(state.attempt - 1);
            if let Some(prev) = &state.last_error {
                debug!(
                    attempt = state.attempt,
                    delay_ms = delay.as_millis() as u64,
                    prev = %prev,
                    "Backing off before retry"
                );
            }
            sleep(delay).await;
        }
    }

    /// Record a failed attempt, or surface it as the terminal error when no
    /// further attempt is permitted.
    fn absorb_or_fail(
        &self,
        state: &mut RetryState,
        error: ClassifiedError,
    ) -> std::result::Result<(), ClassifiedError> {
        warn!(
            attempt = state.attempt,
            max_attempts = self.retry.max_attempts(),
            kind = %error.kind,
            error = %error,
            "Generation attempt failed"
        );

        if !self.retry.should_retry(state.attempt, &error) {
            return Err(error);
        }

        state.last_error = Some(error);
        Ok(())
    }

    /// Mid-stream failures are terminal STREAM_ERROR once content has been
    /// emitted; failures before any fragment keep their original kind.
    fn stream_failure(error: ClassifiedError, fragments_seen: u32) -> ClassifiedError {
        if error.kind == ErrorKind::StreamError || fragments_seen == 0 {
            return error;
        }
        ClassifiedError::new(
            ErrorKind::StreamError,
            format!(
                "stream interrupted after {fragments_seen} fragments: {}",
                error.message
            ),
        )
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .finish()
    }
}
