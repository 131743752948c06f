//! Generation Orchestrator
//!
//! The façade callers use to turn a template id (or raw prompt) into tracked,
//! callback-driven generation state. Resolves the filled prompt through the
//! template collaborator, delegates to the [`GenerationClient`], accumulates
//! streamed fragments, and reports terminal outcomes through both return
//! values and optional callbacks.
//!
//! One orchestrator instance backs one logical "assist" surface. State is
//! owned exclusively by the instance; callers read cloned snapshots. Every
//! operation is tagged with a monotonic generation id so a response arriving
//! after `reset` (or after a newer operation) is silently discarded instead
//! of corrupting current state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::client::GenerationClient;
use super::provider::TokenUsage;
use crate::template::{TemplateParams, TemplateSource};
use crate::types::{ClassifiedError, ErrorKind};

/// Observable state of one assist surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationState {
    /// Generated text; accumulates during streaming, replaced wholesale on
    /// non-streaming completion
    pub content: String,
    /// Whether an operation is in flight
    pub is_loading: bool,
    /// Human-readable message of the last failure, if any
    pub error: Option<String>,
    /// Progress estimate in [0, 100]
    pub progress: u8,
}

impl Default for GenerationState {
    fn default() -> Self {
        Self {
            content: String::new(),
            is_loading: false,
            error: None,
            progress: 0,
        }
    }
}

/// Envelope delivered with the completion callback
#[derive(Debug, Clone)]
pub struct CompletionMetadata {
    /// Correlation id for tracing one logical operation end to end
    pub correlation_id: Uuid,
    /// Template that produced the prompt, when one was used
    pub template_id: Option<String>,
    /// Parameters echoed back from the request
    pub params: TemplateParams,
    /// Completion timestamp
    pub completed_at: DateTime<Utc>,
    /// Length of the generated text in characters
    pub response_chars: usize,
    /// Model that served the request
    pub model: String,
    /// Token usage, when the provider reported it
    pub usage: Option<TokenUsage>,
}

type StreamHandler = Box<dyn Fn(&str, u8) + Send + Sync>;
type CompleteHandler = Box<dyn Fn(&str, &CompletionMetadata) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(&ClassifiedError) + Send + Sync>;

/// Façade over template resolution, generation, and state tracking
pub struct GenerationOrchestrator {
    templates: Arc<dyn TemplateSource>,
    client: Arc<GenerationClient>,
    streaming: bool,
    state: Mutex<GenerationState>,
    /// Monotonic operation counter; writes apply only while their id is current
    generation: AtomicU64,
    on_stream: Option<StreamHandler>,
    on_complete: Option<CompleteHandler>,
    on_error: Option<ErrorHandler>,
}

impl GenerationOrchestrator {
    pub fn new(templates: Arc<dyn TemplateSource>, client: Arc<GenerationClient>) -> Self {
        Self {
            templates,
            client,
            streaming: false,
            state: Mutex::new(GenerationState::default()),
            generation: AtomicU64::new(0),
            on_stream: None,
            on_complete: None,
            on_error: None,
        }
    }

    /// Use the incremental-stream response mode for generate calls
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Register a fragment callback: `(fragment, progress)` per decoded chunk
    pub fn on_stream(mut self, handler: impl Fn(&str, u8) + Send + Sync + 'static) -> Self {
        self.on_stream = Some(Box::new(handler));
        self
    }

    /// Register a completion callback, fired exactly once per successful call
    pub fn on_complete(
        mut self,
        handler: impl Fn(&str, &CompletionMetadata) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(handler));
        self
    }

    /// Register an error callback, fired exactly once per failed call
    pub fn on_error(
        mut self,
        handler: impl Fn(&ClassifiedError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Resolve `template_id` with `params` and generate from the filled
    /// prompt. An unresolved id fails with INVALID_REQUEST without
    /// contacting the client.
    pub async fn generate(
        &self,
        template_id: &str,
        params: &TemplateParams,
    ) -> std::result::Result<String, ClassifiedError> {
        let op = self.begin();

        let Some(prompt) = self.templates.fill_template(template_id, params) else {
            let err = ClassifiedError::new(
                ErrorKind::InvalidRequest,
                format!("template '{template_id}' not found"),
            );
            self.apply_failure(op, &err);
            return Err(err);
        };

        self.run(op, &prompt, Some(template_id.to_string()), params.clone())
            .await
    }

    /// Generate directly from a raw prompt, skipping template resolution
    pub async fn generate_from_prompt(
        &self,
        prompt: &str,
    ) -> std::result::Result<String, ClassifiedError> {
        let op = self.begin();
        self.run(op, prompt, None, TemplateParams::new()).await
    }

    /// Snapshot of the current state
    pub fn state(&self) -> GenerationState {
        self.lock_state().clone()
    }

    /// Synchronously restore the initial state tuple.
    ///
    /// Does not cancel an in-flight request; its results are discarded when
    /// they arrive because their generation id is no longer current.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.lock_state() = GenerationState::default();
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Start a new logical operation: bump the generation id and apply the
    /// entry transitions (loading, cleared error, zero progress).
    fn begin(&self) -> u64 {
        let op = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.lock_state();
        state.is_loading = true;
        state.error = None;
        state.progress = 0;
        state.content.clear();
        op
    }

    async fn run(
        &self,
        op: u64,
        prompt: &str,
        template_id: Option<String>,
        params: TemplateParams,
    ) -> std::result::Result<String, ClassifiedError> {
        let correlation_id = Uuid::new_v4();
        debug!(%correlation_id, streaming = self.streaming, "Starting generation");

        let result = if self.streaming {
            self.client
                .generate_content_stream(prompt, |fragment, progress| {
                    if !self.is_current(op) {
                        return;
                    }
                    {
                        let mut state = self.lock_state();
                        state.content.push_str(fragment);
                        state.progress = progress;
                    }
                    if let Some(handler) = &self.on_stream {
                        handler(fragment, progress);
                    }
                })
                .await
        } else {
            self.client.generate_content(prompt).await
        };

        match result {
            Ok(output) => {
                if self.is_current(op) {
                    {
                        let mut state = self.lock_state();
                        state.content = output.content.clone();
                        state.is_loading = false;
                        state.progress = 100;
                    }
                    if let Some(handler) = &self.on_complete {
                        let metadata = CompletionMetadata {
                            correlation_id,
                            template_id,
                            params,
                            completed_at: Utc::now(),
                            response_chars: output.content.chars().count(),
                            model: self.client.model().to_string(),
                            usage: output.usage,
                        };
                        handler(&output.content, &metadata);
                    }
                } else {
                    debug!(%correlation_id, "Discarding stale completion");
                }
                Ok(output.content)
            }
            Err(err) => {
                warn!(%correlation_id, kind = %err.kind, error = %err, "Generation failed");
                self.apply_failure(op, &err);
                Err(err)
            }
        }
    }

    /// Record a terminal failure, unless the operation has been superseded
    fn apply_failure(&self, op: u64, err: &ClassifiedError) {
        if !self.is_current(op) {
            debug!("Discarding stale failure");
            return;
        }
        {
            let mut state = self.lock_state();
            state.error = Some(err.message.clone());
            state.is_loading = false;
        }
        if let Some(handler) = &self.on_error {
            handler(err);
        }
    }

    fn is_current(&self, op: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == op
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Orchestrator state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl std::fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("streaming", &self.streaming)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::provider::{
        ByteStream, CompletionProvider, CompletionRequest, CompletionResponse,
    };
    use crate::generation::retry::RetryConfig;
    use crate::template::TemplateRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    /// Mock provider: optionally gated so tests control when it responds
    struct MockProvider {
        calls: AtomicU32,
        payload: String,
        gate: Option<Arc<tokio::sync::Notify>>,
    }

    impl MockProvider {
        fn new(payload: &str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                payload: payload.to_string(),
                gate: None,
            }
        }

        fn gated(payload: &str, gate: Arc<tokio::sync::Notify>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                payload: payload.to_string(),
                gate: Some(gate),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionProvider for MockProvider {
        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ClassifiedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(CompletionResponse {
                content: Some(self.payload.clone()),
                usage: None,
            })
        }

        async fn open_stream(
            &self,
            _request: &CompletionRequest,
        ) -> std::result::Result<ByteStream, ClassifiedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let items: Vec<std::result::Result<Vec<u8>, ClassifiedError>> = self
                .payload
                .chars()
                .map(|c| {
                    let delta =
                        serde_json::json!({"choices": [{"delta": {"content": c.to_string()}}]});
                    Ok(format!("data: {delta}\n").into_bytes())
                })
                .chain(std::iter::once(Ok(b"data: [DONE]\n".to_vec())))
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn health_check(&self) -> std::result::Result<bool, ClassifiedError> {
            Ok(true)
        }
    }

    fn registry() -> Arc<TemplateRegistry> {
        Arc::new(TemplateRegistry::with_builtins())
    }

    fn client_over(provider: Arc<MockProvider>) -> Arc<GenerationClient> {
        Arc::new(GenerationClient::with_provider(
            provider,
            RetryConfig::default(),
        ))
    }

    fn params(pairs: &[(&str, &str)]) -> TemplateParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_non_streaming_success_sets_terminal_state() {
        let provider = Arc::new(MockProvider::new("the draft"));
        let orchestrator =
            GenerationOrchestrator::new(registry(), client_over(Arc::clone(&provider)));

        let content = orchestrator
            .generate("introduction-academic", &params(&[("topic", "X")]))
            .await
            .unwrap();

        assert_eq!(content, "the draft");
        let state = orchestrator.state();
        assert_eq!(state.content, "the draft");
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        assert_eq!(state.progress, 100);
    }

    #[tokio::test]
    async fn test_unknown_template_fails_without_provider_call() {
        let provider = Arc::new(MockProvider::new("unused"));
        let errors = Arc::new(AtomicU32::new(0));
        let errors_seen = Arc::clone(&errors);

        let orchestrator =
            GenerationOrchestrator::new(registry(), client_over(Arc::clone(&provider)))
                .on_error(move |err| {
                    assert_eq!(err.kind, ErrorKind::InvalidRequest);
                    errors_seen.fetch_add(1, Ordering::SeqCst);
                });

        let err = orchestrator
            .generate("no-such-template", &TemplateParams::new())
            .await
            .unwrap_err();

        assert!(err.message.contains("not found"));
        assert_eq!(provider.calls(), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        let state = orchestrator.state();
        assert!(!state.is_loading);
        assert!(state.error.as_deref().unwrap_or("").contains("not found"));
    }

    #[tokio::test]
    async fn test_streaming_accumulates_and_fires_callbacks_in_order() {
        let provider = Arc::new(MockProvider::new("ABC"));
        let fragments: Arc<Mutex<Vec<(String, u8)>>> = Arc::new(Mutex::new(Vec::new()));
        let fragments_seen = Arc::clone(&fragments);
        let completions = Arc::new(AtomicU32::new(0));
        let completions_seen = Arc::clone(&completions);

        let orchestrator =
            GenerationOrchestrator::new(registry(), client_over(Arc::clone(&provider)))
                .with_streaming(true)
                .on_stream(move |fragment, progress| {
                    fragments_seen
                        .lock()
                        .unwrap()
                        .push((fragment.to_string(), progress));
                })
                .on_complete(move |content, metadata| {
                    assert_eq!(content, "ABC");
                    assert_eq!(metadata.response_chars, 3);
                    assert_eq!(metadata.model, "mock-model");
                    assert_eq!(metadata.template_id, None);
                    completions_seen.fetch_add(1, Ordering::SeqCst);
                });

        let content = orchestrator.generate_from_prompt("draft it").await.unwrap();

        assert_eq!(content, "ABC");
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        let observed = fragments.lock().unwrap().clone();
        let texts: Vec<&str> = observed.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C", ""]);
        assert_eq!(observed.last().unwrap().1, 100);

        let state = orchestrator.state();
        assert_eq!(state.content, "ABC");
        assert_eq!(state.progress, 100);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_completion_metadata_echoes_template_context() {
        let provider = Arc::new(MockProvider::new("done"));
        let seen: Arc<Mutex<Option<CompletionMetadata>>> = Arc::new(Mutex::new(None));
        let seen_inner = Arc::clone(&seen);

        let orchestrator =
            GenerationOrchestrator::new(registry(), client_over(provider)).on_complete(
                move |_, metadata| {
                    *seen_inner.lock().unwrap() = Some(metadata.clone());
                },
            );

        orchestrator
            .generate("conclusion-brief", &params(&[("topic", "erosion")]))
            .await
            .unwrap();

        let metadata = seen.lock().unwrap().clone().unwrap();
        assert_eq!(metadata.template_id.as_deref(), Some("conclusion-brief"));
        assert_eq!(metadata.params.get("topic").map(String::as_str), Some("erosion"));
        assert_eq!(metadata.response_chars, 4);
    }

    #[tokio::test]
    async fn test_reset_restores_initial_tuple() {
        let provider = Arc::new(MockProvider::new("text"));
        let orchestrator = GenerationOrchestrator::new(registry(), client_over(provider));

        orchestrator.generate_from_prompt("p").await.unwrap();
        assert_ne!(orchestrator.state(), GenerationState::default());

        orchestrator.reset();
        assert_eq!(orchestrator.state(), GenerationState::default());
    }

    #[tokio::test]
    async fn test_stale_completion_after_reset_is_discarded() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let provider = Arc::new(MockProvider::gated("late", Arc::clone(&gate)));
        let completions = Arc::new(AtomicU32::new(0));
        let completions_seen = Arc::clone(&completions);

        let orchestrator = Arc::new(
            GenerationOrchestrator::new(registry(), client_over(Arc::clone(&provider)))
                .on_complete(move |_, _| {
                    completions_seen.fetch_add(1, Ordering::SeqCst);
                }),
        );

        let worker = Arc::clone(&orchestrator);
        let handle =
            tokio::spawn(async move { worker.generate_from_prompt("slow").await });

        // Wait until the provider call is actually in flight
        while provider.calls() == 0 {
            tokio::task::yield_now().await;
        }

        orchestrator.reset();
        gate.notify_one();

        // The await-er still receives the payload
        let content = handle.await.unwrap().unwrap();
        assert_eq!(content, "late");

        // But state stays reset and the completion callback never fired
        assert_eq!(orchestrator.state(), GenerationState::default());
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_prompt_failure_reaches_state_and_callback() {
        let provider = Arc::new(MockProvider::new("unused"));
        let errors = Arc::new(AtomicU32::new(0));
        let errors_seen = Arc::clone(&errors);

        let orchestrator =
            GenerationOrchestrator::new(registry(), client_over(Arc::clone(&provider)))
                .on_error(move |_| {
                    errors_seen.fetch_add(1, Ordering::SeqCst);
                });

        let err = orchestrator.generate_from_prompt("   ").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidRequest);
        assert_eq!(provider.calls(), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(orchestrator.state().error.is_some());
    }
}
