//! Generator module - assembles pages from the content API and renders them
//! with the built-in Tera templates

mod home;
mod post;

use anyhow::{Context as _, Result};
use chrono_tz::Tz;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::prismic::ContentApi;
use crate::templates::{CommentsView, SiteView, TemplateRenderer};

/// Seconds between refreshes of the loading placeholder
const LOADING_REFRESH_SECS: u64 = 1;

/// Page assembler and renderer over a content API
pub struct Generator<C> {
    api: Arc<C>,
    config: SiteConfig,
    tz: Tz,
    renderer: Arc<TemplateRenderer>,
}

impl<C> Clone for Generator<C> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            config: self.config.clone(),
            tz: self.tz,
            renderer: Arc::clone(&self.renderer),
        }
    }
}

impl<C: ContentApi> Generator<C> {
    /// Create a new generator
    pub fn new(api: Arc<C>, config: SiteConfig) -> Result<Self> {
        let tz = config.tz()?;
        let renderer = TemplateRenderer::new()?;

        Ok(Self {
            api,
            config,
            tz,
            renderer: Arc::new(renderer),
        })
    }

    pub fn api(&self) -> &C {
        &self.api
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    fn site_view(&self) -> SiteView {
        SiteView {
            title: self.config.title.clone(),
            language: self.config.language.clone(),
        }
    }

    fn comments_view(&self) -> CommentsView {
        let comments = &self.config.comments;
        CommentsView {
            script: comments.script.clone(),
            repo: comments.repo.clone(),
            issue_term: comments.issue_term.clone(),
            theme: comments.theme.clone(),
            label: comments.label.clone(),
        }
    }

    pub fn render_loading(&self) -> Result<String> {
        self.renderer.loading(&self.site_view(), LOADING_REFRESH_SECS)
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.renderer.not_found(&self.site_view())
    }

    pub fn render_preview_redirect(&self, path: &str) -> Result<String> {
        self.renderer.preview_redirect(&self.site_view(), path)
    }

    /// Generate the home page and the pre-rendered posts into `public_dir`
    ///
    /// Returns the number of pages written.
    pub async fn generate(&self, public_dir: &Path, static_dir: &Path) -> Result<usize> {
        fs::create_dir_all(public_dir)
            .with_context(|| format!("Failed to create {:?}", public_dir))?;

        // Copy static assets (images, css)
        let copied = copy_static(static_dir, public_dir)?;
        tracing::debug!("Copied {} static files", copied);

        let home = self.home_page().await?;
        write_page(&public_dir.join("index.html"), &self.render_home(&home)?)?;
        let mut written = 1;

        for slug in self.static_paths().await? {
            let Some(output) = post_output_path(public_dir, &slug) else {
                tracing::warn!("Skipping post with unusable slug {:?}", slug);
                continue;
            };
            match self.post_page(&slug, None).await? {
                Some(page) => {
                    write_page(&output, &self.render_post(&page)?)?;
                    written += 1;
                }
                None => tracing::warn!("Post {:?} disappeared while generating", slug),
            }
        }

        Ok(written)
    }
}

/// `public/post/{slug}/index.html`, or `None` when the slug is not a single path segment
fn post_output_path(public_dir: &Path, slug: &str) -> Option<PathBuf> {
    if slug.is_empty() || slug == "." || slug == ".." || slug.contains(['/', '\\']) {
        return None;
    }
    Some(public_dir.join("post").join(slug).join("index.html"))
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::debug!("Generated: {:?}", path);
    Ok(())
}

/// Copy everything under `static_dir` into `public_dir`
fn copy_static(static_dir: &Path, public_dir: &Path) -> Result<usize> {
    if !static_dir.exists() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(static_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let relative = entry.path().strip_prefix(static_dir)?;
        let dest = public_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &dest)
            .with_context(|| format!("Failed to copy {:?}", entry.path()))?;
        copied += 1;
    }

    Ok(copied)
}
