//! Campaign attribute record and query-string extraction.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// One of the five recognized UTM attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Source,
    Medium,
    Campaign,
    Term,
    Content,
}

impl Attribute {
    /// All attributes in canonical order.
    pub const ALL: [Attribute; 5] = [
        Attribute::Source,
        Attribute::Medium,
        Attribute::Campaign,
        Attribute::Term,
        Attribute::Content,
    ];

    /// Inbound query-string key (e.g. `utm_source`).
    pub fn query_key(self) -> &'static str {
        match self {
            Attribute::Source => "utm_source",
            Attribute::Medium => "utm_medium",
            Attribute::Campaign => "utm_campaign",
            Attribute::Term => "utm_term",
            Attribute::Content => "utm_content",
        }
    }

    /// Label used in the visitor-context section of the prompt.
    pub fn prompt_label(self) -> &'static str {
        match self {
            Attribute::Source => "Traffic source",
            Attribute::Medium => "Marketing medium",
            Attribute::Campaign => "Campaign name",
            Attribute::Term => "Search term/keyword",
            Attribute::Content => "Ad content/variant",
        }
    }

    /// Short label used in the human-readable campaign summary.
    pub fn summary_label(self) -> &'static str {
        match self {
            Attribute::Source => "Source",
            Attribute::Medium => "Medium",
            Attribute::Campaign => "Campaign",
            Attribute::Term => "Term",
            Attribute::Content => "Content",
        }
    }

    /// Look up an attribute by its query-string key.
    pub fn from_query_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.query_key() == key)
    }
}

/// Normalized UTM campaign attributes for one inbound request.
///
/// Empty strings are normalized to `None` on every construction path, so
/// "absent" and "empty" are indistinguishable downstream. The serialized
/// form uses the `utm_*` keys and omits absent attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRecord {
    #[serde(
        rename = "utm_source",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    source: Option<String>,
    #[serde(
        rename = "utm_medium",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    medium: Option<String>,
    #[serde(
        rename = "utm_campaign",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    campaign: Option<String>,
    #[serde(
        rename = "utm_term",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    term: Option<String>,
    #[serde(
        rename = "utm_content",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    content: Option<String>,
}

fn non_empty<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

impl AttributeRecord {
    /// Create an empty record (every attribute absent).
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the recognized attributes from query-string pairs.
    ///
    /// Unrecognized keys are ignored, empty values count as absent and the
    /// first occurrence of a repeated key wins. Never fails.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = Self::new();
        let mut seen = [false; 5];
        for (key, value) in pairs {
            let Some(attr) = Attribute::from_query_key(key.as_ref()) else {
                continue;
            };
            let idx = attr as usize;
            if seen[idx] {
                continue;
            }
            seen[idx] = true;
            record.set(attr, value.as_ref());
        }
        record
    }

    /// Extract the recognized attributes from a raw query string.
    ///
    /// Accepts an optional leading `?`. Keys and values are decoded as
    /// `application/x-www-form-urlencoded`, so `+` is a space and malformed
    /// escapes are kept verbatim.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(form_urlencoded::parse(query.as_bytes()))
    }

    /// Set an attribute. An empty value clears it.
    pub fn set(&mut self, attr: Attribute, value: impl Into<String>) {
        let value = Some(value.into()).filter(|v| !v.is_empty());
        *self.slot_mut(attr) = value;
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, attr: Attribute, value: impl Into<String>) -> Self {
        self.set(attr, value);
        self
    }

    pub fn source(self, value: impl Into<String>) -> Self {
        self.with(Attribute::Source, value)
    }

    pub fn medium(self, value: impl Into<String>) -> Self {
        self.with(Attribute::Medium, value)
    }

    pub fn campaign(self, value: impl Into<String>) -> Self {
        self.with(Attribute::Campaign, value)
    }

    pub fn term(self, value: impl Into<String>) -> Self {
        self.with(Attribute::Term, value)
    }

    pub fn content(self, value: impl Into<String>) -> Self {
        self.with(Attribute::Content, value)
    }

    /// Value of an attribute, if present.
    pub fn get(&self, attr: Attribute) -> Option<&str> {
        match attr {
            Attribute::Source => self.source.as_deref(),
            Attribute::Medium => self.medium.as_deref(),
            Attribute::Campaign => self.campaign.as_deref(),
            Attribute::Term => self.term.as_deref(),
            Attribute::Content => self.content.as_deref(),
        }
    }

    fn slot_mut(&mut self, attr: Attribute) -> &mut Option<String> {
        match attr {
            Attribute::Source => &mut self.source,
            Attribute::Medium => &mut self.medium,
            Attribute::Campaign => &mut self.campaign,
            Attribute::Term => &mut self.term,
            Attribute::Content => &mut self.content,
        }
    }

    /// Present attributes in canonical order.
    pub fn present(&self) -> impl Iterator<Item = (Attribute, &str)> {
        Attribute::ALL
            .into_iter()
            .filter_map(|attr| self.get(attr).map(|v| (attr, v)))
    }

    /// Whether at least one attribute is present.
    pub fn has_any(&self) -> bool {
        self.present().next().is_some()
    }

    /// Human-readable campaign summary, e.g. `Source: google, Medium: cpc`.
    pub fn describe(&self) -> String {
        self.present()
            .map(|(attr, value)| format!("{}: {value}", attr.summary_label()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
