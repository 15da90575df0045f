//! Headliner - the personalized-message generation service

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use super::HeadlinerBuilder;
use crate::cache::{CacheKey, MessageCache};
use crate::prompt::build_messages;
use crate::providers::GenerationProvider;
use crate::telemetry;
use crate::transport::{MessageStream, StreamTransport};
use crate::types::{AttributeRecord, Completion, FinishReason, GenerateOptions, Generated};
use crate::{HeadlinerError, Result};

/// How a streamed request is answered.
pub enum Delivery {
    /// A live cached message, delivered whole.
    Cached(String),
    /// A fresh generation relayed fragment by fragment.
    Streaming(MessageStream),
}

/// Personalized-message generation service.
///
/// Built once per process and shared by every request handler. Holds the
/// completion provider, the process-wide [`MessageCache`] and the completion
/// options.
///
/// Concurrent requests for the same attributes are not coalesced: each miss
/// calls the provider, and the last completed generation is the one cached.
pub struct Headliner {
    provider: Arc<dyn GenerationProvider>,
    cache: Arc<MessageCache>,
    transport: StreamTransport,
    options: GenerateOptions,
}

impl Headliner {
    /// Create a new builder for configuring the service.
    pub fn builder() -> HeadlinerBuilder {
        HeadlinerBuilder::new()
    }

    pub(crate) fn new(
        provider: Arc<dyn GenerationProvider>,
        cache: Arc<MessageCache>,
        transport: StreamTransport,
        options: GenerateOptions,
    ) -> Self {
        Self {
            provider,
            cache,
            transport,
            options,
        }
    }

    /// The shared message cache.
    pub fn cache(&self) -> &Arc<MessageCache> {
        &self.cache
    }

    /// Completion options sent with every request.
    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Name of the configured provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate (or fetch from cache) the complete message for `record`.
    ///
    /// Returns [`HeadlinerError::InvalidInput`] without touching the cache
    /// or the provider when no attribute is present.
    #[instrument(name = "headliner.generate", skip(self, record))]
    pub async fn generate(&self, record: &AttributeRecord) -> Result<Generated> {
        let key = validate(record)?;
        metrics::counter!(telemetry::GENERATIONS_TOTAL, "mode" => "complete").increment(1);

        if let Some(message) = self.cache.lookup(&key) {
            info!(%key, "cache hit");
            return Ok(Generated {
                message,
                cached: true,
            });
        }

        let messages = build_messages(record);
        let start = Instant::now();
        let result = self.provider.complete(&messages, &self.options).await;
        record_duration("complete", start, result.is_ok());

        let completion = result.inspect_err(|e| {
            warn!(%key, error = %e, provider = self.provider.name(), "generation failed");
            metrics::counter!(telemetry::PROVIDER_ERRORS_TOTAL, "mode" => "complete")
                .increment(1);
        })?;

        record_completion(&completion);
        self.cache.store(key, completion.text.as_str());
        Ok(Generated {
            message: completion.text,
            cached: false,
        })
    }

    /// Start delivering the message for `record` as a stream.
    ///
    /// A live cache entry is returned whole as [`Delivery::Cached`].
    /// Otherwise the provider is asked for a streaming completion and its
    /// fragments are relayed through a [`MessageStream`]; the complete
    /// message is cached once the upstream finishes. Errors returned here
    /// happen before any byte is produced.
    #[instrument(name = "headliner.generate_stream", skip(self, record))]
    pub async fn generate_stream(&self, record: &AttributeRecord) -> Result<Delivery> {
        let key = validate(record)?;
        metrics::counter!(telemetry::GENERATIONS_TOTAL, "mode" => "stream").increment(1);

        if let Some(message) = self.cache.lookup(&key) {
            info!(%key, "cache hit");
            return Ok(Delivery::Cached(message));
        }

        let messages = build_messages(record);
        let start = Instant::now();
        let result = self.provider.complete_stream(&messages, &self.options).await;
        record_duration("stream", start, result.is_ok());

        let fragments = result.inspect_err(|e| {
            warn!(%key, error = %e, provider = self.provider.name(), "stream request failed");
            metrics::counter!(telemetry::PROVIDER_ERRORS_TOTAL, "mode" => "stream").increment(1);
        })?;

        Ok(Delivery::Streaming(self.transport.relay(key, fragments)))
    }
}

/// Reject records with no attribute before any work is done.
fn validate(record: &AttributeRecord) -> Result<CacheKey> {
    if !record.has_any() {
        return Err(HeadlinerError::InvalidInput(
            "No UTM parameters provided".to_string(),
        ));
    }
    Ok(CacheKey::from_record(record))
}

fn record_duration(mode: &'static str, start: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::histogram!(
        telemetry::PROVIDER_DURATION_SECONDS,
        "mode" => mode,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

fn record_completion(completion: &Completion) {
    if completion.finish_reason == FinishReason::Length {
        warn!(
            model = ?completion.model,
            "completion hit the token limit, copy may be cut short"
        );
    }
    if let Some(usage) = &completion.usage {
        debug!(
            model = ?completion.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "completion usage"
        );
        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "prompt")
            .increment(u64::from(usage.prompt_tokens));
        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "completion")
            .increment(u64::from(usage.completion_tokens));
    }
}
