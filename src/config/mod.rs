//! Configuration module

mod site;

pub use site::SiteConfig;
pub use site::CommentsConfig;
pub use site::PaginationConfig;
pub use site::PreviewConfig;
pub use site::PrismicConfig;
pub use site::ReadingConfig;
pub use site::{ENV_ACCESS_TOKEN, ENV_ENDPOINT, ENV_PREVIEW_SECRET};
