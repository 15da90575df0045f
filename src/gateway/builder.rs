//! Builder for configuring the generation service

use std::sync::Arc;

use super::Headliner;
use crate::Result;
use crate::cache::{CacheConfig, Clock, MessageCache, SystemClock};
use crate::providers::openai::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::providers::{GenerationProvider, OpenAiProvider};
use crate::transport::{DEFAULT_STREAM_BUFFER, StreamTransport};
use crate::types::GenerateOptions;

/// Builder for configuring a [`Headliner`] service.
///
/// Without an explicit [`provider`](Self::provider), an
/// [`OpenAiProvider`] is built from [`openai`](Self::openai),
/// [`base_url`](Self::base_url) and [`timeout`](Self::timeout).
pub struct HeadlinerBuilder {
    provider: Option<Arc<dyn GenerationProvider>>,
    openai_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    options: GenerateOptions,
    cache_config: CacheConfig,
    clock: Option<Arc<dyn Clock>>,
    stream_buffer: usize,
}

impl HeadlinerBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            openai_key: None,
            base_url: None,
            timeout_secs: None,
            options: GenerateOptions::default(),
            cache_config: CacheConfig::default(),
            clock: None,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    /// Use a custom completion provider.
    pub fn provider(mut self, provider: impl GenerationProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Use a shared completion provider.
    pub fn shared_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// API key for the default OpenAI provider.
    ///
    /// `None` is accepted: the service still builds, and every generation
    /// fails with an authentication error.
    pub fn openai(mut self, api_key: Option<impl Into<String>>) -> Self {
        self.openai_key = api_key.map(Into::into);
        self
    }

    /// Base URL of the OpenAI-compatible endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Overall upstream request timeout (seconds).
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Replace the completion options.
    pub fn options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    /// Configure the message cache (TTL, capacity).
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Clock used for cache expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Fragments buffered between the upstream reader and the caller.
    pub fn stream_buffer(mut self, size: usize) -> Self {
        self.stream_buffer = size;
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<Headliner> {
        let provider = match self.provider {
            Some(provider) => provider,
            None => Arc::new(OpenAiProvider::with_base_url(
                self.openai_key,
                self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            )?),
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = Arc::new(MessageCache::with_clock(&self.cache_config, clock));
        let transport = StreamTransport::new(cache.clone(), self.stream_buffer);

        Ok(Headliner::new(provider, cache, transport, self.options))
    }
}

impl Default for HeadlinerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
