//! Incremental post list ("load more")

use std::collections::HashSet;

use super::post::{PostPagination, PostSummary};
use crate::prismic::{ContentApi, ContentError};

/// A post list that grows one upstream page at a time
///
/// Each cursor is loaded at most once, so repeated calls with the same
/// `next_page` never append the same records twice.
#[derive(Debug, Clone, Default)]
pub struct PostFeed {
    posts: Vec<PostSummary>,
    next_page: Option<String>,
    loaded: HashSet<String>,
}

impl PostFeed {
    pub fn new(initial: PostPagination) -> Self {
        Self {
            posts: initial.results,
            next_page: initial.next_page,
            loaded: HashSet::new(),
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Fetch the page behind the current cursor and append its posts
    ///
    /// Returns the number of posts appended; 0 when there is nothing left
    /// to load or the cursor was already loaded.
    pub async fn load_more<C: ContentApi>(&mut self, api: &C) -> Result<usize, ContentError> {
        let Some(cursor) = self.next_page.clone() else {
            return Ok(0);
        };
        if !self.loaded.insert(cursor.clone()) {
            tracing::debug!("Cursor already loaded, skipping");
            return Ok(0);
        }

        let page = match api.fetch_page(&cursor).await {
            Ok(page) => page,
            Err(e) => {
                self.loaded.remove(&cursor);
                return Err(e);
            }
        };
        let next = PostPagination::from_api_page(page).inspect_err(|_| {
            self.loaded.remove(&cursor);
        })?;

        let appended = next.results.len();
        self.posts.extend(next.results);
        self.next_page = next.next_page;
        tracing::debug!("Loaded {} more posts", appended);

        Ok(appended)
    }

    /// Keep loading until the upstream list is exhausted
    pub async fn load_all<C: ContentApi>(&mut self, api: &C) -> Result<usize, ContentError> {
        let mut total = 0;
        while self.has_more() {
            let appended = self.load_more(api).await?;
            if appended == 0 && self.next_page.as_ref().is_some_and(|c| self.loaded.contains(c)) {
                break;
            }
            total += appended;
        }
        Ok(total)
    }
}
