//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Retry constants
pub mod retry {
    /// Default maximum attempts per logical request (first attempt included)
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

    /// Maximum delay between attempts (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;
}

/// HTTP/Network constants
pub mod network {
    /// Default per-attempt request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
}

/// Streaming progress constants
pub mod stream {
    /// Progress gained per content-bearing fragment (percent)
    pub const PROGRESS_STEP: u8 = 7;

    /// Ceiling for heuristic progress while the stream is still open.
    /// 100 is reserved for normal stream completion.
    pub const PROGRESS_CAP: u8 = 95;

    /// Progress reported by the terminal fragment
    pub const PROGRESS_DONE: u8 = 100;
}

/// Generation defaults
pub mod generation {
    /// Default sampling temperature for drafting
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// Default maximum output tokens per completion
    pub const DEFAULT_MAX_OUTPUT_TOKENS: usize = 1024;

    /// Default model identifier
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

    /// Default API base for OpenAI-compatible endpoints
    pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
}
