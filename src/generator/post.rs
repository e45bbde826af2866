//! Post pages: lookup by slug, neighbours and the pre-rendered path list

use anyhow::{Context as _, Result};

use super::Generator;
use crate::content::{
    reading_time, NeighborPost, PostDetail, PostPage, NEIGHBOR_FIELDS, POST_TYPE,
};
use crate::helpers::{date_xml, exit_preview_href, format_date, format_datetime, post_path};
use crate::prismic::{ContentApi, Ordering, Predicate, Query};
use crate::templates::{NavLink, PostView, SectionView};

const PUBLICATION_DATE: &str = "document.first_publication_date";

impl<C: ContentApi> Generator<C> {
    /// Assemble the page for `slug`, pinned to `preview_ref` when given
    ///
    /// Returns `None` when no post has that slug.
    pub async fn post_page(&self, slug: &str, preview_ref: Option<&str>) -> Result<Option<PostPage>> {
        let doc = self
            .api
            .get_by_uid(POST_TYPE, slug, preview_ref)
            .await
            .with_context(|| format!("Failed to fetch post {:?}", slug))?;
        let Some(doc) = doc else {
            tracing::debug!("No post with slug {:?}", slug);
            return Ok(None);
        };

        let post = PostDetail::from_document(doc)?;
        let prev_post = self.neighbor(&post.id, Ordering::asc(PUBLICATION_DATE)).await?;
        let next_post = self.neighbor(&post.id, Ordering::desc(PUBLICATION_DATE)).await?;

        Ok(Some(PostPage {
            post,
            prev_post,
            next_post,
            preview: preview_ref.is_some(),
        }))
    }

    /// First post after `id` in the given publication order
    async fn neighbor(&self, id: &str, ordering: Ordering) -> Result<Option<NeighborPost>> {
        let query = Query::new()
            .predicate(Predicate::at("document.type", POST_TYPE))
            .fetch(NEIGHBOR_FIELDS)
            .page_size(1)
            .after(id)
            .ordering(ordering);

        let page = self
            .api
            .query(&query)
            .await
            .context("Failed to fetch neighbouring post")?;
        let neighbor = page
            .results
            .into_iter()
            .next()
            .map(NeighborPost::from_document)
            .transpose()?;
        Ok(neighbor)
    }

    /// Slugs rendered ahead of time; everything else is rendered on first request
    pub async fn static_paths(&self) -> Result<Vec<String>> {
        let query = Query::new()
            .predicate(Predicate::at("document.type", POST_TYPE))
            .fetch(NEIGHBOR_FIELDS)
            .page_size(self.config.pagination.static_paths);

        let page = self
            .api
            .query(&query)
            .await
            .context("Failed to fetch the pre-rendered post list")?;
        Ok(page.results.into_iter().filter_map(|doc| doc.uid).collect())
    }

    pub fn render_post(&self, page: &PostPage) -> Result<String> {
        let post = &page.post;
        let reading = &self.config.reading;

        let view = PostView {
            title: post.title.clone(),
            banner: post.banner.clone(),
            author: post.author.clone(),
            date: post
                .first_publication_date
                .map(|date| format_date(&date, self.tz))
                .unwrap_or_default(),
            date_xml: post
                .first_publication_date
                .map(|date| date_xml(&date, self.tz))
                .unwrap_or_default(),
            edited: post
                .last_publication_date
                .filter(|_| post.was_edited())
                .map(|date| format_datetime(&date, self.tz)),
            reading_time: reading_time(&post.content, reading.counting, reading.words_per_minute),
            sections: post
                .content
                .iter()
                .map(|section| SectionView {
                    heading: section.heading.clone(),
                    html: section.body.as_html(),
                })
                .collect(),
            prev_post: page.prev_post.as_ref().map(nav_link),
            next_post: page.next_post.as_ref().map(nav_link),
            exit_preview_href: page
                .preview
                .then(|| exit_preview_href(&post_path(&post.uid))),
        };

        self.renderer
            .post(&self.site_view(), &view, &self.comments_view())
    }
}

fn nav_link(post: &NeighborPost) -> NavLink {
    NavLink {
        href: post_path(&post.uid),
        title: post.title.clone(),
    }
}
