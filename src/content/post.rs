//! Post models shaped from upstream documents

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::richtext::RichText;
use crate::prismic::{null_default, ApiPage, ContentError, Document};

/// Custom type of post documents
pub const POST_TYPE: &str = "posts";

/// Fields fetched for the post list
pub const SUMMARY_FIELDS: [&str; 3] = ["posts.title", "posts.subtitle", "posts.author"];

/// Fields fetched for previous/next links
pub const NEIGHBOR_FIELDS: [&str; 1] = ["posts.title"];

/// A post as listed on the home page
#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

#[derive(Debug, Default, Deserialize)]
struct SummaryFields {
    #[serde(default, deserialize_with = "null_default")]
    title: String,
    #[serde(default, deserialize_with = "null_default")]
    subtitle: String,
    #[serde(default, deserialize_with = "null_default")]
    author: String,
}

impl PostSummary {
    pub fn from_document(doc: Document) -> Result<Self, ContentError> {
        let uid = require_uid(&doc)?;
        let fields: SummaryFields = data_fields(doc.data)?;
        Ok(Self {
            uid,
            first_publication_date: doc.first_publication_date,
            title: fields.title,
            subtitle: fields.subtitle,
            author: fields.author,
        })
    }
}

/// One page of post summaries plus the cursor to the next one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPagination {
    pub results: Vec<PostSummary>,
    pub next_page: Option<String>,
}

impl PostPagination {
    pub fn from_api_page(page: ApiPage) -> Result<Self, ContentError> {
        let results = page
            .results
            .into_iter()
            .map(PostSummary::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            results,
            next_page: page.next_page,
        })
    }
}

/// A titled section of a post body
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentSection {
    #[serde(default, deserialize_with = "null_default")]
    pub heading: String,
    #[serde(default, deserialize_with = "null_default")]
    pub body: RichText,
}

/// A full post, ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct PostDetail {
    /// Upstream internal identifier, used to find neighbours
    pub id: String,
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub last_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    /// Banner image URL (may be empty)
    pub banner: String,
    pub author: String,
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Default, Deserialize)]
struct BannerField {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailFields {
    #[serde(default, deserialize_with = "null_default")]
    title: String,
    #[serde(default, deserialize_with = "null_default")]
    banner: BannerField,
    #[serde(default, deserialize_with = "null_default")]
    author: String,
    #[serde(default, deserialize_with = "null_default")]
    content: Vec<ContentSection>,
}

impl PostDetail {
    pub fn from_document(doc: Document) -> Result<Self, ContentError> {
        let uid = require_uid(&doc)?;
        let fields: DetailFields = data_fields(doc.data)?;
        Ok(Self {
            id: doc.id,
            uid,
            first_publication_date: doc.first_publication_date,
            last_publication_date: doc.last_publication_date,
            title: fields.title,
            banner: fields.banner.url.unwrap_or_default(),
            author: fields.author,
            content: fields.content,
        })
    }

    /// Whether the post was republished after its first publication
    pub fn was_edited(&self) -> bool {
        match (self.first_publication_date, self.last_publication_date) {
            (Some(first), Some(last)) => last > first,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

/// Link target for the previous/next footer
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborPost {
    pub uid: String,
    pub title: String,
}

impl NeighborPost {
    pub fn from_document(doc: Document) -> Result<Self, ContentError> {
        let uid = require_uid(&doc)?;
        let fields: SummaryFields = data_fields(doc.data)?;
        Ok(Self {
            uid,
            title: fields.title,
        })
    }
}

/// Everything the post page renders
#[derive(Debug, Clone, PartialEq)]
pub struct PostPage {
    pub post: PostDetail,
    pub prev_post: Option<NeighborPost>,
    pub next_post: Option<NeighborPost>,
    pub preview: bool,
}

/// Deserialize a document's `data`, treating a missing object as empty
fn data_fields<T: DeserializeOwned + Default>(data: serde_json::Value) -> Result<T, ContentError> {
    if data.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(data)?)
}

fn require_uid(doc: &Document) -> Result<String, ContentError> {
    doc.uid
        .clone()
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| ContentError::missing(doc.id.clone(), "uid"))
}
