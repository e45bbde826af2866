//! Content module - post models, rich text, reading time and the post feed

pub mod feed;
mod post;
pub mod reading;
pub mod richtext;

pub use feed::PostFeed;
pub use post::{
    ContentSection, NeighborPost, PostDetail, PostPage, PostPagination, PostSummary,
    NEIGHBOR_FIELDS, POST_TYPE, SUMMARY_FIELDS,
};
pub use reading::{reading_time, WordCounting};
pub use richtext::RichText;
