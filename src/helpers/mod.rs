//! Helper functions shared by the assemblers, templates and handlers

mod date;
mod url;

pub use date::*;
pub use url::*;
