//! Draftsmith - LLM-Backed Drafting Engine for Report Authoring
//!
//! Turns a report-section template (or raw prompt) into a reliable,
//! observable call to an external completion provider, with retry/backoff,
//! error classification, and token-streaming support.
//!
//! ## Core Features
//!
//! - **Error Classification**: Failures map to a fixed taxonomy with retry
//!   eligibility derived from the kind
//! - **Bounded Retry**: Exponential backoff, invisible to callers beyond
//!   latency
//! - **Streaming**: SSE decoding into ordered text fragments with a
//!   monotone progress estimate
//! - **Orchestration**: Single façade tracking per-operation state with
//!   completion/error/stream callbacks and stale-result protection
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use draftsmith::{ClientCache, Config, GenerationOrchestrator, TemplateRegistry};
//!
//! let config = Config::default();
//! let cache = ClientCache::new();
//! let client = cache.get_or_init(&config.llm)?;
//! let registry = Arc::new(TemplateRegistry::with_builtins());
//!
//! let orchestrator = GenerationOrchestrator::new(registry, client)
//!     .with_streaming(true)
//!     .on_stream(|fragment, progress| print!("{fragment}"));
//!
//! let content = orchestrator.generate("introduction-academic", &params).await?;
//! ```
//!
//! ## Modules
//!
//! - [`generation`]: provider boundary, retry, streaming, orchestration
//! - [`template`]: template collaborator trait and built-in registry
//! - [`config`]: layered configuration
//! - [`types`]: error taxonomy and classification

pub mod cli;
pub mod config;
pub mod constants;
pub mod generation;
pub mod template;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, LlmConfig};

// Error Types
pub use types::error::{ClassifiedError, DraftError, ErrorClassifier, ErrorKind, Result};

// Templates
pub use template::{Template, TemplateParams, TemplateRegistry, TemplateSource};

// =============================================================================
// Generation Re-exports
// =============================================================================

pub use generation::{
    // Client
    ClientCache,
    CompletionMetadata,
    // Provider boundary
    CompletionProvider,
    CompletionRequest,
    GenerationClient,
    // Orchestration
    GenerationOrchestrator,
    GenerationOutput,
    GenerationState,
    HttpCompletionProvider,
    // Retry
    RetryConfig,
    RetryPolicy,
    // Streaming
    StreamDecoder,
    TokenUsage,
};
