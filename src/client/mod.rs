//! Client library for a running headlinerd.
//!
//! [`HeadlinerClient`] calls the generation endpoints over HTTP. Its
//! streaming call re-parses the message after every received chunk, so a
//! page can render the headline while the description is still arriving.

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parser::{IncrementalParser, ParsedMessage};
use crate::types::{AttributeRecord, Generated};
use crate::{HeadlinerError, Result};

/// Default headlinerd address.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Progressive parses of a streamed message, one per received chunk.
pub type ParsedStream = Pin<Box<dyn Stream<Item = Result<ParsedMessage>> + Send>>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    utm_params: &'a AttributeRecord,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the generation endpoints.
#[derive(Debug, Clone)]
pub struct HeadlinerClient {
    http: reqwest::Client,
    base_url: String,
}

impl HeadlinerClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HeadlinerError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_http_client(base_url, http))
    }

    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the complete message for `record`.
    pub async fn generate(&self, record: &AttributeRecord) -> Result<Generated> {
        let response = self.post("generate-message", record).await?;
        Ok(response.json::<Generated>().await?)
    }

    /// Stream the message for `record`, yielding the parse of everything
    /// received so far after each chunk.
    ///
    /// A server-side abort ends the stream with an `Err` item after the
    /// parses of the prefix that did arrive. If the body ends inside a
    /// multi-byte character, one last parse includes the flushed bytes.
    pub async fn generate_stream(&self, record: &AttributeRecord) -> Result<ParsedStream> {
        let response = self.post("generate-message-stream", record).await?;
        let body = Box::pin(response.bytes_stream());
        let parses = stream::unfold(
            (body, Some(IncrementalParser::new())),
            |(mut body, parser)| async move {
                let mut parser = parser?;
                match body.next().await {
                    Some(Ok(bytes)) => {
                        let parsed = parser.push_bytes(&bytes);
                        Some((Ok(parsed), (body, Some(parser))))
                    }
                    Some(Err(e)) => {
                        let err = HeadlinerError::Stream(e.to_string());
                        Some((Err(err), (body, None)))
                    }
                    None if parser.has_pending() => Some((Ok(parser.finish()), (body, None))),
                    None => None,
                }
            },
        );
        Ok(Box::pin(parses))
    }

    async fn post(&self, path: &str, record: &AttributeRecord) -> Result<reqwest::Response> {
        let url = format!("{}/{path}", self.base_url);
        debug!(%url, campaign = %record.describe(), "requesting message");

        let response = self
            .http
            .post(&url)
            .json(&GenerateBody { utm_params: record })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(if status == reqwest::StatusCode::BAD_REQUEST {
            HeadlinerError::InvalidInput(message)
        } else {
            HeadlinerError::Api {
                status: status.as_u16(),
                message,
            }
        })
    }
}
