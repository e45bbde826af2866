//! Preview mode: token resolution and the signed preview cookie
//!
//! Lifecycle of the preview reference:
//! - set by `/api/preview` once the token resolves to a page,
//! - read on every post render (pins the post to that ref),
//! - cleared by `/api/exit-preview`, whether or not it was set.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::helpers::link_resolver;
use crate::prismic::{ContentApi, ContentError};

type HmacSha256 = Hmac<Sha256>;

/// Data carried by the preview cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewData {
    /// Content ref issued by the CMS for the preview
    #[serde(rename = "ref")]
    pub reference: String,
}

/// Issues, verifies and clears the preview cookie
#[derive(Clone)]
pub struct PreviewSession {
    cookie_name: String,
    mac: HmacSha256,
}

impl PreviewSession {
    pub fn new(cookie_name: impl Into<String>, key: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            cookie_name: cookie_name.into(),
            mac: HmacSha256::new_from_slice(key)?,
        })
    }

    /// Session with a random key; cookies do not survive a restart
    pub fn with_random_key(cookie_name: impl Into<String>) -> Result<Self, InvalidLength> {
        let mut key = [0u8; 32];
        rand::thread_rng().fill(&mut key);
        Self::new(cookie_name, &key)
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn sign(&self, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac
    }

    /// Signed cookie value for `data`
    pub fn encode(&self, data: &PreviewData) -> Result<String, serde_json::Error> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(data)?);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload).finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    /// Verify a cookie value and return its data
    pub fn decode(&self, value: &str) -> Option<PreviewData> {
        let (payload, signature) = value.split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        self.sign(payload).verify_slice(&signature).ok()?;
        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&json).ok()
    }

    /// `Set-Cookie` value that stores `data` for the browser session
    pub fn set_cookie(&self, data: &PreviewData) -> Result<String, serde_json::Error> {
        Ok(format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name,
            self.encode(data)?
        ))
    }

    /// `Set-Cookie` value that removes the preview cookie
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            self.cookie_name
        )
    }

    /// Preview data of a request, if it carries a valid cookie
    pub fn read(&self, headers: &HeaderMap) -> Option<PreviewData> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == self.cookie_name)
            .find_map(|(_, value)| self.decode(value))
    }
}

/// Resolve a preview token to the path that should display the document
///
/// `Ok(None)` means the API rejected the token.
pub async fn resolve_preview<C: ContentApi>(
    api: &C,
    token: &str,
    document_id: Option<&str>,
) -> Result<Option<String>, ContentError> {
    let Some(document_id) = document_id.filter(|id| !id.is_empty()) else {
        return Ok(Some("/".to_string()));
    };

    match api.get_by_id(document_id, Some(token)).await {
        Ok(Some(doc)) => Ok(Some(link_resolver(&doc.doc_type, doc.uid.as_deref()))),
        Ok(None) => Ok(Some("/".to_string())),
        Err(ContentError::RefRejected) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prismic::testing::{sample_posts, FakeApi};
    use axum::http::HeaderValue;

    fn session() -> PreviewSession {
        PreviewSession::new("preview", b"secret").unwrap()
    }

    fn data() -> PreviewData {
        PreviewData {
            reference: "https://repo.prismic.io/previews/abc".to_string(),
        }
    }

    #[test]
    fn test_encode_decode() {
        let session = session();
        let value = session.encode(&data()).unwrap();
        assert_eq!(session.decode(&value), Some(data()));
    }

    #[test]
    fn test_tampered_cookie_is_rejected() {
        let session = session();
        let value = session.encode(&data()).unwrap();
        let forged = PreviewData {
            reference: "other".to_string(),
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let signature = value.split_once('.').unwrap().1;
        assert_eq!(session.decode(&format!("{}.{}", forged_payload, signature)), None);

        let other_key = PreviewSession::new("preview", b"another").unwrap();
        assert_eq!(other_key.decode(&value), None);
        assert_eq!(session.decode("garbage"), None);
    }

    #[test]
    fn test_read_from_headers() {
        let session = session();
        let cookie = format!("theme=dark; preview={}", session.encode(&data()).unwrap());
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        assert_eq!(session.read(&headers), Some(data()));
        assert_eq!(session.read(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_headers() {
        let session = session();
        let set = session.set_cookie(&data()).unwrap();
        assert!(set.starts_with("preview="));
        assert!(set.contains("HttpOnly"));
        let clear = session.clear_cookie();
        assert!(clear.starts_with("preview=;"));
        assert!(clear.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_resolve_post_preview() {
        let api = FakeApi::new(sample_posts()).with_ref("preview-ref");
        let path = resolve_preview(&api, "preview-ref", Some("B2")).await.unwrap();
        assert_eq!(path.as_deref(), Some("/post/second-post"));
    }

    #[tokio::test]
    async fn test_resolve_rejected_token() {
        let api = FakeApi::new(sample_posts());
        let path = resolve_preview(&api, "bogus", Some("B2")).await.unwrap();
        assert_eq!(path, None);
    }

    #[tokio::test]
    async fn test_resolve_defaults_to_home() {
        let api = FakeApi::new(sample_posts()).with_ref("preview-ref");
        assert_eq!(
            resolve_preview(&api, "preview-ref", None).await.unwrap().as_deref(),
            Some("/")
        );
        assert_eq!(
            resolve_preview(&api, "preview-ref", Some("missing")).await.unwrap().as_deref(),
            Some("/")
        );
    }
}
