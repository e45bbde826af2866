//! List posts from the content API

use anyhow::Result;
use chrono_tz::Tz;

use crate::content::{PostFeed, PostSummary};
use crate::helpers::format_date;
use crate::Spacetraveling;

/// Print the first page of posts, or every post with `all`
pub async fn run(app: &Spacetraveling, all: bool) -> Result<()> {
    let generator = app.generator()?;
    let tz = app.config.tz()?;

    let mut feed = PostFeed::new(generator.home_page().await?);
    if all {
        feed.load_all(generator.api()).await?;
    }

    println!("Posts ({}):", feed.posts().len());
    for post in feed.posts() {
        println!("{}", format_line(post, tz));
    }
    if feed.has_more() {
        println!("More posts available (use --all to list them)");
    }

    Ok(())
}

fn format_line(post: &PostSummary, tz: Tz) -> String {
    let date = post
        .first_publication_date
        .map(|date| format_date(&date, tz))
        .unwrap_or_else(|| "-".to_string());
    format!("  {} - {} [{}]", date, post.title, post.uid)
}
