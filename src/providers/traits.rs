//! Provider trait for completion backends.
//!
//! The service talks to the upstream model through [`GenerationProvider`],
//! so tests can substitute a scripted provider and deployments can point at
//! any OpenAI-compatible endpoint.
//!
//! # Error Semantics
//!
//! Every error returned from a provider is terminal for the request: the
//! service does not retry and does not fall back to another provider.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;

use crate::Result;
use crate::types::{Completion, GenerateOptions, Message};

/// Lazy, finite sequence of text fragments from a streaming completion.
///
/// Fragments concatenate to the complete message. The stream can be
/// consumed once; an `Err` item means the upstream failed mid-stream.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Backend capable of producing a completion for a chat transcript.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Whole-response completion.
    async fn complete(&self, messages: &[Message], options: &GenerateOptions)
    -> Result<Completion>;

    /// Streaming completion.
    ///
    /// Resolves once the upstream has accepted the request; fragments then
    /// arrive through the returned stream.
    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<FragmentStream>;
}

#[async_trait]
impl<P: GenerationProvider + ?Sized> GenerationProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<Completion> {
        (**self).complete(messages, options).await
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<FragmentStream> {
        (**self).complete_stream(messages, options).await
    }
}
