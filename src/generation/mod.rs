//! Generation Subsystem
//!
//! Turns a content-generation request into a reliable, observable call to the
//! external completion provider.
//!
//! ## Modules
//!
//! - `provider`: boundary trait and the OpenAI-compatible HTTP implementation
//! - `retry`: exponential backoff policy and per-call attempt tracking
//! - `stream`: SSE decoding into text fragments with progress estimates
//! - `client`: bounded retry loop over the provider, both response modes
//! - `orchestrator`: state-tracking façade with callbacks
//! - `cache`: lazy, memoized client construction

pub mod cache;
pub mod client;
pub mod orchestrator;
pub mod provider;
pub mod retry;
pub mod stream;

pub use cache::ClientCache;
pub use client::{GenerationClient, GenerationOutput};
pub use orchestrator::{CompletionMetadata, GenerationOrchestrator, GenerationState};
pub use provider::{
    ByteStream, CompletionProvider, CompletionRequest, CompletionResponse,
    HttpCompletionProvider, TokenUsage,
};
pub use retry::{RetryConfig, RetryPolicy};
pub use stream::{DecodedFragment, StreamDecoder};
