//! Built-in spacetraveling templates using the Tera template engine
//!
//! Templates are embedded directly in the binary. Autoescaping is on for
//! every template; rich text HTML and the redirect script literal are the
//! only values marked safe.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

/// Template renderer with the embedded theme
#[derive(Clone)]
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);
        tera.set_escape_fn(escape_html);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("index.html", include_str!("spacetraveling/index.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("loading.html", include_str!("spacetraveling/loading.html")),
            ("not_found.html", include_str!("spacetraveling/not_found.html")),
            (
                "preview_redirect.html",
                include_str!("spacetraveling/preview_redirect.html"),
            ),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/comments.html",
                include_str!("spacetraveling/partials/comments.html"),
            ),
            (
                "partials/load_more.html",
                include_str!("spacetraveling/partials/load_more.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Home page with the first page of posts
    pub fn home(&self, site: &SiteView, home: &HomeView) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("home", home);
        self.render("index.html", &context)
    }

    pub fn post(&self, site: &SiteView, post: &PostView, comments: &CommentsView) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("post", post);
        context.insert("comments", comments);
        self.render("post.html", &context)
    }

    /// Placeholder shown while a page is generated on demand
    pub fn loading(&self, site: &SiteView, refresh_secs: u64) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("refresh", &refresh_secs);
        self.render("loading.html", &context)
    }

    pub fn not_found(&self, site: &SiteView) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        self.render("not_found.html", &context)
    }

    /// Page that sends the browser to `path` once the preview cookie is set
    pub fn preview_redirect(&self, site: &SiteView, path: &str) -> Result<String> {
        // JSON string literal, with `<` escaped so it cannot close the script
        let path_literal = serde_json::to_string(path)?.replace('<', "\\u003c");

        let mut context = Context::new();
        context.insert("site", site);
        context.insert("path", path);
        context.insert("path_literal", &path_literal);
        self.render("preview_redirect.html", &context)
    }
}

/// Escape text and attribute values; `/` is left alone so URLs stay readable
fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteView {
    pub title: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub date_xml: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub posts: Vec<PostCard>,
    /// Cursor URL fetched by the "load more" button
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavLink {
    pub href: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub heading: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub title: String,
    pub banner: String,
    pub author: String,
    pub date: String,
    pub date_xml: String,
    /// Last publication, present only when the post was edited
    pub edited: Option<String>,
    pub reading_time: usize,
    pub sections: Vec<SectionView>,
    pub prev_post: Option<NavLink>,
    pub next_post: Option<NavLink>,
    pub exit_preview_href: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsView {
    pub script: String,
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
    pub label: String,
}
