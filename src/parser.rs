//! Best-effort extraction of headline and description from generated copy.
//!
//! The model is asked for
//!
//! ```text
//! Headline: <text>
//! Description: <text>
//! ```
//!
//! but nothing enforces it. [`parse_message`] accepts any text, including a
//! partially received one, and always returns a [`ParsedMessage`]:
//!
//! 1. `**` bold markers are stripped.
//! 2. If both a `Headline:` and a `Description:` label are found
//!    (case-insensitive), their trimmed captures are used.
//! 3. Otherwise the first non-blank line is the headline (`Welcome!` if there
//!    is none) and the remaining non-blank lines, joined by spaces, are the
//!    description.
//!
//! [`IncrementalParser`] wraps this for the consuming side of a stream: it
//! accumulates raw byte chunks, decodes UTF-8 across chunk boundaries and
//! re-parses everything received so far after each chunk.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Headline used when the text has no usable line.
pub const FALLBACK_HEADLINE: &str = "Welcome!";

/// Description shown by consumers when a request fails before any text
/// arrives.
pub const FALLBACK_DESCRIPTION: &str = "We're glad you're here.";

const BOLD_MARKER: &str = "**";

static HEADLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Headline:\s*(.+?)(?:\n|Description:|$)").expect("valid headline pattern")
});

static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Description:\s*(.+)$").expect("valid description pattern")
});

/// Headline and description extracted from a generated message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub headline: String,
    pub description: String,
}

impl ParsedMessage {
    pub fn new(headline: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            description: description.into(),
        }
    }

    /// Copy shown when generation fails outright.
    pub fn fallback() -> Self {
        Self::new(FALLBACK_HEADLINE, FALLBACK_DESCRIPTION)
    }
}

/// Parse a complete or partial generated message. Never fails.
pub fn parse_message(text: &str) -> ParsedMessage {
    let clean = text.replace(BOLD_MARKER, "");

    let headline = HEADLINE
        .captures(&clean)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim());
    let description = DESCRIPTION
        .captures(&clean)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim());

    if let (Some(headline), Some(description)) = (headline, description) {
        return ParsedMessage::new(headline, description);
    }

    let mut lines = clean.lines().map(str::trim).filter(|l| !l.is_empty());
    let headline = lines.next().unwrap_or(FALLBACK_HEADLINE).to_string();
    let description = lines.collect::<Vec<_>>().join(" ");
    ParsedMessage {
        headline,
        description,
    }
}

/// Accumulates a streamed message and re-parses it after every chunk.
#[derive(Debug, Default)]
pub struct IncrementalParser {
    text: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
}

impl IncrementalParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw byte chunk and parse everything received so far.
    ///
    /// An incomplete multi-byte sequence at the end of the chunk is held
    /// back until the next chunk completes it. Invalid sequences decode to
    /// U+FFFD.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> ParsedMessage {
        self.pending.extend_from_slice(chunk);
        let mut rest: &[u8] = &self.pending;
        let mut consumed = 0;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    consumed += rest.len();
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.text.push_str(&String::from_utf8_lossy(valid));
                    consumed += valid.len();
                    match e.error_len() {
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            consumed += bad;
                            rest = &after[bad..];
                        }
                        None => break,
                    }
                }
            }
        }
        self.pending.drain(..consumed);
        self.parsed()
    }

    /// Append already-decoded text and parse everything received so far.
    pub fn push_str(&mut self, chunk: &str) -> ParsedMessage {
        self.push_bytes(chunk.as_bytes())
    }

    /// Parse of everything received so far.
    pub fn parsed(&self) -> ParsedMessage {
        parse_message(&self.text)
    }

    /// Text decoded so far, excluding any held-back partial sequence.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether an incomplete multi-byte sequence is being held back.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Flush any held-back bytes (lossily) and return the final parse.
    pub fn finish(mut self) -> ParsedMessage {
        if !self.pending.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending).into_owned();
            self.text.push_str(&tail);
            self.pending.clear();
        }
        self.parsed()
    }
}
