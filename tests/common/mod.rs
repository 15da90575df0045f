//! Shared test doubles.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::stream;
use headliner::{
    Completion, FinishReason, FragmentStream, GenerateOptions, GenerationProvider,
    HeadlinerError, Message, Result, Usage,
};

/// What a [`ScriptedProvider`] does when called.
#[derive(Clone)]
pub enum Script {
    /// Succeed with these fragments (concatenated for `complete`).
    Reply(Vec<&'static str>),
    /// Succeed with this text, cut off at the token limit.
    Truncated(&'static str),
    /// Fail before producing anything.
    Fail,
    /// Stream these fragments, then fail. `complete` fails outright.
    FailMidStream(Vec<&'static str>),
}

/// Provider double that replays a script and counts calls.
pub struct ScriptedProvider {
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn reply(fragments: Vec<&'static str>) -> Self {
        Self::new(Script::Reply(fragments))
    }

    /// Handle for reading the call count after the provider is moved.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

pub fn call_count(calls: &AtomicUsize) -> usize {
    calls.load(Ordering::SeqCst)
}

fn upstream_down() -> HeadlinerError {
    HeadlinerError::Api {
        status: 503,
        message: "upstream unavailable".into(),
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &GenerateOptions,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(fragments) => Ok(Completion {
                text: fragments.concat(),
                usage: Some(REPLY_USAGE),
                model: Some("scripted-1".into()),
                finish_reason: FinishReason::Stop,
            }),
            Script::Truncated(text) => Ok(Completion {
                text: text.to_string(),
                usage: Some(REPLY_USAGE),
                model: Some("scripted-1".into()),
                finish_reason: FinishReason::Length,
            }),
            Script::Fail | Script::FailMidStream(_) => Err(upstream_down()),
        }
    }

    async fn complete_stream(
        &self,
        _messages: &[Message],
        _options: &GenerateOptions,
    ) -> Result<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Truncated(text) => {
                let items: Vec<Result<String>> = vec![Ok(text.to_string())];
                Ok(Box::pin(stream::iter(items)))
            }
            Script::Reply(fragments) => {
                let items: Vec<Result<String>> =
                    fragments.iter().map(|f| Ok(f.to_string())).collect();
                Ok(Box::pin(stream::iter(items)))
            }
            Script::Fail => Err(upstream_down()),
            Script::FailMidStream(fragments) => {
                let mut items: Vec<Result<String>> =
                    fragments.iter().map(|f| Ok(f.to_string())).collect();
                items.push(Err(HeadlinerError::Stream("connection reset".into())));
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }
}

/// Token usage reported with every scripted complete reply.
pub const REPLY_USAGE: Usage = Usage {
    prompt_tokens: 120,
    completion_tokens: 20,
    total_tokens: 140,
};

/// The reply used by most tests.
pub const HEADLINE_FRAGMENTS: [&str; 4] = [
    "**Headline:** Resolve ",
    "incidents faster\n",
    "**Description:** On-call, response and ",
    "status pages in one place.",
];

pub fn headline_reply() -> ScriptedProvider {
    ScriptedProvider::reply(HEADLINE_FRAGMENTS.to_vec())
}
