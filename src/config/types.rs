//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/draftsmith/) and project (.draftsmith/) level
//! configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{generation as gen_constants, network as net_constants, retry as retry_constants};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Completion provider settings
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `DraftError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::types::DraftError::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(crate::types::DraftError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_attempts == 0 {
            return Err(crate::types::DraftError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.llm.max_output_tokens == 0 {
            return Err(crate::types::DraftError::Config(
                "max_output_tokens must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for the completion provider and generation client.
///
/// Note: API keys are handled securely - they are never serialized to output
/// and are redacted in debug output. The provider converts the key to
/// SecretString internally for runtime protection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL (OpenAI-compatible endpoint)
    pub api_base: String,

    /// Model name
    pub model: String,

    /// API key; falls back to the DRAFTSMITH_API_KEY / OPENAI_API_KEY env vars.
    /// Never serialized to output for security.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Sampling temperature (0.0 = deterministic, higher = creative)
    pub temperature: f32,

    /// Maximum tokens to generate per completion
    pub max_output_tokens: usize,

    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum attempts per logical request (first attempt included)
    pub max_attempts: u32,

    /// Base delay for exponential backoff (milliseconds)
    pub base_delay_ms: u64,

    /// Whether generation requests stream incremental fragments
    pub streaming: bool,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("streaming", &self.streaming)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: gen_constants::DEFAULT_API_BASE.to_string(),
            model: gen_constants::DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: gen_constants::DEFAULT_TEMPERATURE,
            max_output_tokens: gen_constants::DEFAULT_MAX_OUTPUT_TOKENS,
            timeout_secs: net_constants::DEFAULT_TIMEOUT_SECS,
            max_attempts: retry_constants::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: retry_constants::DEFAULT_BASE_DELAY_MS,
            streaming: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_temperature_rejected() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = Config::default();
        config.llm.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let config = LlmConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
