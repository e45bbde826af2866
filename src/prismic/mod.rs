//! Content API client (Prismic)
//!
//! The rest of the crate talks to the repository through the
//! [`ContentApi`] trait so assemblers can run against the HTTP client or an
//! in-memory fake.

mod client;
mod document;
mod error;
mod query;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;

pub use client::PrismicClient;
pub use document::{null_default, parse_timestamp, ApiInfo, ApiPage, Document, RefInfo};
pub use error::{ContentError, Result};
pub use query::{Direction, Ordering, Predicate, Query};

/// Read access to a headless content repository
pub trait ContentApi: Send + Sync + 'static {
    /// Run a search query
    fn query(&self, query: &Query) -> impl Future<Output = Result<ApiPage>> + Send;

    /// Dereference a pagination cursor exactly as the API returned it
    fn fetch_page(&self, cursor: &str) -> impl Future<Output = Result<ApiPage>> + Send;

    /// Look up a document of `doc_type` by its unique identifier
    fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        reference: Option<&str>,
    ) -> impl Future<Output = Result<Option<Document>>> + Send {
        let query = Query::new()
            .predicate(Predicate::at(format!("my.{}.uid", doc_type), uid))
            .page_size(1)
            .reference(reference);
        async move {
            let page = self.query(&query).await?;
            Ok(page.results.into_iter().next())
        }
    }

    /// Look up a document by its internal id
    fn get_by_id(
        &self,
        id: &str,
        reference: Option<&str>,
    ) -> impl Future<Output = Result<Option<Document>>> + Send {
        let query = Query::new()
            .predicate(Predicate::at("document.id", id))
            .page_size(1)
            .reference(reference);
        async move {
            let page = self.query(&query).await?;
            Ok(page.results.into_iter().next())
        }
    }
}
