//! Home page: first page of posts plus the "load more" cursor

use anyhow::{Context as _, Result};

use super::Generator;
use crate::content::{PostPagination, PostSummary, POST_TYPE, SUMMARY_FIELDS};
use crate::helpers::{date_xml, format_date, post_path};
use crate::prismic::{ContentApi, Predicate, Query};
use crate::templates::{HomeView, PostCard};

impl<C: ContentApi> Generator<C> {
    /// Fetch the first page of posts
    pub async fn home_page(&self) -> Result<PostPagination> {
        let query = Query::new()
            .predicate(Predicate::at("document.type", POST_TYPE))
            .fetch(SUMMARY_FIELDS)
            .page_size(self.config.pagination.per_page);

        let page = self
            .api
            .query(&query)
            .await
            .context("Failed to fetch the post list")?;
        tracing::debug!(
            "Fetched {} of {} posts",
            page.results.len(),
            page.total_results_size
        );

        Ok(PostPagination::from_api_page(page)?)
    }

    pub fn render_home(&self, pagination: &PostPagination) -> Result<String> {
        let view = HomeView {
            posts: pagination
                .results
                .iter()
                .map(|post| self.post_card(post))
                .collect(),
            next_page: pagination.next_page.clone(),
        };
        self.renderer.home(&self.site_view(), &view)
    }

    fn post_card(&self, post: &PostSummary) -> PostCard {
        PostCard {
            href: post_path(&post.uid),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: post
                .first_publication_date
                .map(|date| format_date(&date, self.tz))
                .unwrap_or_default(),
            date_xml: post
                .first_publication_date
                .map(|date| date_xml(&date, self.tz))
                .unwrap_or_default(),
        }
    }
}
