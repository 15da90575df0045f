//! Options for personalized-copy generation.

use serde::{Deserialize, Serialize};

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Default cap on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Options sent with every completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Model to use for generation.
    pub model: String,

    /// Sampling temperature (0.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
            .temperature(DEFAULT_TEMPERATURE)
            .max_tokens(DEFAULT_MAX_TOKENS)
    }
}

impl GenerateOptions {
    /// Create options with the specified model and no sampling overrides.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
