//! OpenAI-compatible chat-completions client.
//!
//! Speaks the `/chat/completions` wire format, whole-response or streamed as
//! server-sent events. Any endpoint implementing that format (OpenAI itself,
//! OpenRouter, a local gateway) can be targeted through the base URL.
//! See: <https://platform.openai.com/docs/api-reference/chat>

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use super::traits::{FragmentStream, GenerationProvider};
use crate::parser::FALLBACK_HEADLINE;
use crate::types::{Completion, FinishReason, GenerateOptions, Message, Usage};
use crate::{HeadlinerError, Result};

/// Default base URL for the OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default overall request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Constructed once at startup and shared; the API key is captured here and
/// never re-read. A missing key does not fail construction: every call then
/// fails with [`HeadlinerError::AuthenticationFailed`].
#[derive(Clone)]
pub struct OpenAiProvider {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    name: String,
}

impl OpenAiProvider {
    /// Create a provider for the public OpenAI API.
    pub fn new(api_key: Option<impl Into<String>>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a provider against a custom base URL (self-hosted gateways,
    /// wiremock in tests).
    pub fn with_base_url(
        api_key: Option<impl Into<String>>,
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| HeadlinerError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self::with_http_client(api_key, base_url, http))
    }

    /// Create a provider on a shared HTTP client.
    pub fn with_http_client(
        api_key: Option<impl Into<String>>,
        base_url: impl Into<String>,
        http: Client,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            api_key: api_key.map(Into::<String>::into).filter(|k| !k.is_empty()),
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            name: "openai".to_string(),
        }
    }

    /// Override the provider name used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether an API key was configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(
        &self,
        messages: &[Message],
        options: &GenerateOptions,
        stream: bool,
    ) -> Result<reqwest::Response> {
        let Some(ref key) = self.api_key else {
            warn!(provider = %self.name, "no API key configured");
            return Err(HeadlinerError::AuthenticationFailed);
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .json(&ChatCompletionRequest {
                model: &options.model,
                messages,
                temperature: options.temperature,
                max_tokens: options.max_tokens,
                stream,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".into());
        Err(HeadlinerError::from_status(status.as_u16(), retry_after, body))
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "openai.complete", skip(self, messages, options), fields(model = %options.model, provider = %self.name))]
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<Completion> {
        let response = self.send(messages, options, false).await?;
        let body: ChatCompletionResponse = response.json().await?;

        let choice = body.choices.into_iter().next();
        let finish_reason = choice
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            .map(FinishReason::from_provider)
            .unwrap_or_default();
        let text = choice
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| FALLBACK_HEADLINE.to_string());

        Ok(Completion {
            text,
            usage: body.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: body.model,
            finish_reason,
        })
    }

    #[instrument(name = "openai.complete_stream", skip(self, messages, options), fields(model = %options.model, provider = %self.name))]
    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<FragmentStream> {
        let response = self.send(messages, options, true).await?;
        Ok(sse_fragments(Box::pin(response.bytes_stream())))
    }
}

// ============================================================================
// Server-sent events
// ============================================================================

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

struct SseState {
    body: ByteStream,
    lines: LineBuffer,
    queue: VecDeque<Result<String>>,
    finished: bool,
}

/// Turn a chat-completions SSE body into content fragments.
///
/// Empty deltas are skipped. `data: [DONE]` or the end of the body completes
/// the stream; a transport error, an `error` payload or an unparseable event
/// ends it with an `Err` after every fragment that preceded it.
fn sse_fragments(body: ByteStream) -> FragmentStream {
    let state = SseState {
        body,
        lines: LineBuffer::default(),
        queue: VecDeque::new(),
        finished: false,
    };

    let stream = futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queue.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    let lines = st.lines.push(&bytes);
                    st.handle_lines(lines);
                }
                Some(Err(e)) => {
                    st.queue.push_back(Err(HeadlinerError::Stream(e.to_string())));
                    st.finished = true;
                }
                None => {
                    let tail = st.lines.flush();
                    st.handle_lines(tail);
                    st.finished = true;
                }
            }
        }
    });

    Box::pin(stream)
}

impl SseState {
    fn handle_lines(&mut self, lines: Vec<String>) {
        for line in lines {
            if self.finished {
                return;
            }
            match parse_event_line(&line) {
                SseLine::Done => self.finished = true,
                SseLine::Data(data) => match serde_json::from_str::<ChatCompletionChunk>(data) {
                    Ok(chunk) => {
                        if let Some(err) = chunk.error {
                            self.queue
                                .push_back(Err(HeadlinerError::Stream(err.to_string())));
                            self.finished = true;
                            continue;
                        }
                        let content = chunk
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|c| c.delta)
                            .and_then(|d| d.content)
                            .filter(|c| !c.is_empty());
                        if let Some(content) = content {
                            self.queue.push_back(Ok(content));
                        }
                    }
                    Err(e) => {
                        self.queue.push_back(Err(HeadlinerError::Stream(format!(
                            "malformed event: {e}"
                        ))));
                        self.finished = true;
                    }
                },
                SseLine::Ignored => {}
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine<'a> {
    Data(&'a str),
    Done,
    Ignored,
}

fn parse_event_line(line: &str) -> SseLine<'_> {
    let Some(data) = line.strip_prefix("data:") else {
        // comments, `event:`, `id:`, `retry:` and blank separators
        return SseLine::Ignored;
    };
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data == "[DONE]" {
        SseLine::Done
    } else if data.is_empty() {
        SseLine::Ignored
    } else {
        SseLine::Data(data)
    }
}

/// Splits a byte stream into `\n`-terminated lines.
///
/// A newline byte never occurs inside a multi-byte UTF-8 sequence, so each
/// complete line decodes independently.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(decode_line(&raw[..raw.len() - 1]));
        }
        lines
    }

    fn flush(&mut self) -> Vec<String> {
        if self.buf.is_empty() {
            return Vec::new();
        }
        let raw = std::mem::take(&mut self.buf);
        vec![decode_line(&raw)]
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    #[serde(default)]
    message: Option<WireContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<WireContent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn body(chunks: Vec<&'static str>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, reqwest::Error>(Bytes::from_static(c.as_bytes()))),
        ))
    }

    async fn collect(s: FragmentStream) -> Vec<Result<String>> {
        s.collect().await
    }

    #[test]
    fn event_line_parsing() {
        assert_eq!(parse_event_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_event_line("data:{}"), SseLine::Data("{}"));
        assert_eq!(parse_event_line(": keep-alive"), SseLine::Ignored);
        assert_eq!(parse_event_line(""), SseLine::Ignored);
        assert_eq!(parse_event_line("event: message"), SseLine::Ignored);
    }

    #[test]
    fn line_buffer_handles_split_lines_and_crlf() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"data: a").is_empty());
        assert_eq!(buf.push(b"bc\r\ndata: x\n"), vec!["data: abc", "data: x"]);
        assert!(buf.flush().is_empty());
    }

    #[tokio::test]
    async fn fragments_in_order_until_done() {
        let s = sse_fragments(body(vec![
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Head\"}}]}\n\ndata: {\"choi",
            "ces\":[{\"delta\":{\"content\":\"line\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ]));
        let items: Vec<String> = collect(s).await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(items, vec!["Head", "line"]);
    }

    #[tokio::test]
    async fn error_payload_terminates_after_prior_fragments() {
        let s = sse_fragments(body(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\ndata: {\"error\":{\"message\":\"overloaded\"}}\n\n",
        ]));
        let items = collect(s).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(items[1], Err(HeadlinerError::Stream(_))));
    }

    #[tokio::test]
    async fn body_end_without_done_completes() {
        let s = sse_fragments(body(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}",
        ]));
        let items = collect(s).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "tail");
    }
}
