//! Relays streamed fragments to the caller and commits the result.
//!
//! Each relay runs as one producer task:
//!
//! ```text
//!  Idle ──▶ Streaming ──┬──▶ Completed   (message stored in cache)
//!                       └──▶ Failed      (nothing stored)
//! ```
//!
//! While streaming, every fragment is forwarded as soon as it arrives,
//! through a bounded `mpsc` channel so a slow consumer applies backpressure
//! to the upstream read. Fragments are forwarded in arrival order and never
//! merged. On failure the output ends with an `Err` item; bytes already
//! forwarded stay forwarded, so a consumer can only rely on having seen a
//! prefix.
//!
//! If the consumer drops its [`MessageStream`], forwarding stops but the
//! upstream is still read to the end, and a completed message is still
//! cached for the next visitor with the same attributes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::Result;
use crate::cache::{CacheKey, MessageCache};
use crate::providers::FragmentStream;
use crate::telemetry;

/// Default number of fragments buffered between producer and consumer.
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Lifecycle of a single relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Streaming,
    Completed,
    Failed,
}

impl TransportState {
    /// Whether the relay has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TransportState::Completed | TransportState::Failed)
    }
}

/// Spawns relays that share one message cache.
#[derive(Clone)]
pub struct StreamTransport {
    cache: Arc<MessageCache>,
    buffer: usize,
}

impl StreamTransport {
    pub fn new(cache: Arc<MessageCache>, buffer: usize) -> Self {
        Self {
            cache,
            buffer: buffer.max(1),
        }
    }

    /// Start relaying `fragments`; on completion the full message is stored
    /// under `key`.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn relay(&self, key: CacheKey, fragments: FragmentStream) -> MessageStream {
        let (tx, rx) = mpsc::channel(self.buffer);
        let (state_tx, state_rx) = watch::channel(TransportState::Idle);
        let cache = self.cache.clone();

        tokio::spawn(async move {
            let mut fragments = fragments;
            let mut message = String::new();
            let mut forwarding = true;
            let mut count: u64 = 0;
            state_tx.send_replace(TransportState::Streaming);
            debug!(%key, "relay streaming");

            while let Some(item) = fragments.next().await {
                match item {
                    Ok(fragment) => {
                        message.push_str(&fragment);
                        count += 1;
                        if forwarding && tx.send(Ok(Bytes::from(fragment))).await.is_err() {
                            debug!(%key, "consumer disconnected, draining upstream");
                            forwarding = false;
                        }
                    }
                    Err(e) => {
                        warn!(%key, error = %e, forwarded = count, "upstream stream failed");
                        metrics::counter!(telemetry::PROVIDER_ERRORS_TOTAL, "mode" => "stream")
                            .increment(1);
                        if forwarding {
                            let _ = tx.send(Err(e)).await;
                        }
                        state_tx.send_replace(TransportState::Failed);
                        return;
                    }
                }
            }

            metrics::counter!(telemetry::STREAM_FRAGMENTS_TOTAL).increment(count);
            info!(%key, fragments = count, bytes = message.len(), "stream completed");
            cache.store(key, message);
            // close the output before announcing completion
            drop(tx);
            state_tx.send_replace(TransportState::Completed);
        });

        MessageStream {
            inner: ReceiverStream::new(rx),
            state: state_rx,
        }
    }
}

pin_project! {
    /// Byte stream of one relayed message.
    ///
    /// Yields each fragment as raw UTF-8 bytes. Ends with `None` on
    /// completion, or with an `Err` item followed by `None` on failure.
    pub struct MessageStream {
        #[pin]
        inner: ReceiverStream<Result<Bytes>>,
        state: watch::Receiver<TransportState>,
    }
}

impl MessageStream {
    /// Current relay state.
    pub fn state(&self) -> TransportState {
        *self.state.borrow()
    }

    /// A handle that observes the relay state after the stream itself has
    /// been handed off (e.g. to an HTTP body).
    pub fn state_watch(&self) -> watch::Receiver<TransportState> {
        self.state.clone()
    }
}

impl Stream for MessageStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

/// Wait until a relay reaches a terminal state.
///
/// Returns the last observed state if the relay task ended without
/// reporting one.
pub async fn wait_terminal(mut state: watch::Receiver<TransportState>) -> TransportState {
    loop {
        let current = *state.borrow_and_update();
        if current.is_terminal() {
            return current;
        }
        if state.changed().await.is_err() {
            return *state.borrow();
        }
    }
}
