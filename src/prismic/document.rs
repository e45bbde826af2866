//! Wire types returned by the content API

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};

/// A document as returned by the search endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, deserialize_with = "timestamp")]
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub last_publication_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiPage {
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub total_pages: usize,
    #[serde(default)]
    pub total_results_size: usize,
    #[serde(default)]
    pub results: Vec<Document>,
    /// Opaque cursor for the following page
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Repository information returned by the API root
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<RefInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefInfo {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

impl ApiInfo {
    /// The ref holding the latest published content
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

/// Parse an upstream timestamp (`2021-03-25T19:25:28+0000` or RFC 3339)
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
}

/// Deserialize a nullable timestamp; unparseable values become `None`
fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Deserialize a field that may be `null`, falling back to its default
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
