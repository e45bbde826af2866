//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\'')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Path of a post page
///
/// # Examples
/// ```ignore
/// post_path("my-post") // -> "/post/my-post"
/// ```
pub fn post_path(uid: &str) -> String {
    format!("/post/{}", utf8_percent_encode(uid, SEGMENT))
}

/// Map a document to the site path that displays it
///
/// Posts live under `/post/{uid}`; every other type resolves to the home page.
pub fn link_resolver(doc_type: &str, uid: Option<&str>) -> String {
    match (doc_type, uid) {
        ("posts", Some(uid)) if !uid.is_empty() => post_path(uid),
        _ => "/".to_string(),
    }
}

/// Encode a value for use in a query string
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// Link that leaves preview mode and comes back to `current_path`
pub fn exit_preview_href(current_path: &str) -> String {
    format!(
        "/api/exit-preview?currentUrl={}",
        encode_query_value(current_path)
    )
}

/// Schemes content links may use
const LINK_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// True for relative URLs and `http`, `https` or `mailto` ones
///
/// Whitespace and control characters are ignored while reading the scheme,
/// since browsers drop them too (`java\tscript:` is still `javascript:`).
pub fn is_safe_link(url: &str) -> bool {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    if cleaned.is_empty() {
        return false;
    }
    match cleaned.find([':', '/', '?', '#']) {
        Some(at) if cleaned[at..].starts_with(':') => {
            let scheme = cleaned[..at].to_ascii_lowercase();
            LINK_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}

/// Accept only same-site absolute paths as a redirect target
///
/// Anything else (absent, empty, scheme-relative, absolute URL) becomes `/`.
pub fn safe_return_path(target: Option<&str>) -> String {
    match target {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
