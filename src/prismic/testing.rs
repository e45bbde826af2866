//! In-memory content repository used by unit tests

use std::sync::Mutex;

use serde_json::json;

use super::{parse_timestamp, ApiPage, ContentApi, ContentError, Direction, Document, Query, Result};

const CURSOR_PREFIX: &str = "fake://posts?";

/// Serves documents from memory with the query semantics the crate relies on
pub struct FakeApi {
    documents: Vec<Document>,
    valid_refs: Vec<String>,
    fail_cursors: bool,
    fail_queries: bool,
    pub fetched_cursors: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            valid_refs: Vec::new(),
            fail_cursors: false,
            fail_queries: false,
            fetched_cursors: Mutex::new(Vec::new()),
        }
    }

    /// Accept `reference` as a preview ref
    pub fn with_ref(mut self, reference: &str) -> Self {
        self.valid_refs.push(reference.to_string());
        self
    }

    /// Make every cursor fetch fail
    pub fn failing_cursors(mut self) -> Self {
        self.fail_cursors = true;
        self
    }

    /// Make every search query fail as if the API were down
    pub fn rejecting_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    fn page(&self, mut matching: Vec<Document>, after: Option<&str>, size: usize) -> ApiPage {
        if let Some(after) = after {
            let position = matching.iter().position(|d| d.id == after);
            matching = match position {
                Some(i) => matching.split_off(i + 1),
                None => Vec::new(),
            };
        }

        let total = matching.len();
        let results: Vec<Document> = matching.into_iter().take(size).collect();
        let next_page = if total > results.len() {
            results
                .last()
                .map(|last| format!("{}after={}&pageSize={}", CURSOR_PREFIX, last.id, size))
        } else {
            None
        };

        ApiPage {
            page: 1,
            total_pages: total.div_ceil(size.max(1)),
            total_results_size: total,
            results,
            next_page,
        }
    }
}

impl ContentApi for FakeApi {
    async fn query(&self, query: &Query) -> Result<ApiPage> {
        if self.fail_queries {
            return Err(ContentError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        if let Some(reference) = &query.reference {
            if !self.valid_refs.contains(reference) {
                return Err(ContentError::RefRejected);
            }
        }

        let mut matching: Vec<Document> = self
            .documents
            .iter()
            .filter(|doc| {
                query.predicates.iter().all(|p| match p.path.as_str() {
                    "document.type" => doc.doc_type == p.value,
                    "document.id" => doc.id == p.value,
                    path if path.ends_with(".uid") => doc.uid.as_deref() == Some(p.value.as_str()),
                    _ => false,
                })
            })
            .cloned()
            .collect();

        if let Some(ordering) = &query.ordering {
            matching.sort_by_key(|d| d.first_publication_date);
            if ordering.direction == Direction::Desc {
                matching.reverse();
            }
        }

        Ok(self.page(matching, query.after.as_deref(), query.page_size.unwrap_or(20)))
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiPage> {
        self.fetched_cursors
            .lock()
            .unwrap()
            .push(cursor.to_string());

        if self.fail_cursors {
            return Err(ContentError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }

        let params = cursor.strip_prefix(CURSOR_PREFIX).ok_or(ContentError::Status {
            status: 404,
            body: cursor.to_string(),
        })?;
        let mut after = None;
        let mut size = 20;
        for pair in params.split('&') {
            match pair.split_once('=') {
                Some(("after", value)) => after = Some(value.to_string()),
                Some(("pageSize", value)) => size = value.parse().unwrap_or(20),
                _ => {}
            }
        }

        let posts = self
            .documents
            .iter()
            .filter(|d| d.doc_type == "posts")
            .cloned()
            .collect();
        Ok(self.page(posts, after.as_deref(), size))
    }
}

/// A `posts` document with one content section
pub fn post(id: &str, uid: &str, published: &str, title: &str) -> Document {
    Document {
        id: id.to_string(),
        uid: Some(uid.to_string()),
        doc_type: "posts".to_string(),
        first_publication_date: parse_timestamp(published),
        last_publication_date: parse_timestamp(published),
        data: json!({
            "title": title,
            "subtitle": format!("Sobre {}", title),
            "author": "Joseph Oliveira",
            "banner": {"url": format!("https://images.prismic.io/{}.png", uid), "alt": null},
            "content": [{
                "heading": "Introdução",
                "body": [
                    {"type": "paragraph", "text": "Lorem ipsum dolor sit amet", "spans": []}
                ]
            }]
        }),
    }
}

/// Three posts published on consecutive days, inserted oldest first
pub fn sample_posts() -> Vec<Document> {
    vec![
        post("A1", "first-post", "2021-03-01T10:00:00+0000", "First post"),
        post("B2", "second-post", "2021-03-02T10:00:00+0000", "Second post"),
        post("C3", "third-post", "2021-03-03T10:00:00+0000", "Third post"),
    ]
}
