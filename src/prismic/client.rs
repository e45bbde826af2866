//! HTTP implementation of [`ContentApi`]

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

use super::error::{ContentError, Result};
use super::{ApiInfo, ApiPage, ContentApi, Query};

/// How long a looked-up master ref is reused before asking again
const MASTER_REF_TTL: Duration = Duration::from_secs(5);

/// Authenticated handle to a Prismic repository
///
/// Clones share the cached master ref.
#[derive(Debug, Clone)]
pub struct PrismicClient {
    endpoint: Url,
    access_token: String,
    http_client: Client,
    master_ref: Arc<RefCache>,
}

/// The last master ref seen and when it was fetched
#[derive(Debug)]
struct RefCache {
    ttl: Duration,
    slot: RwLock<Option<(String, Instant)>>,
}

impl RefCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    async fn get(&self) -> Option<String> {
        let slot = self.slot.read().await;
        let (reference, fetched_at) = slot.as_ref()?;
        (fetched_at.elapsed() < self.ttl).then(|| reference.clone())
    }

    async fn set(&self, reference: String) {
        *self.slot.write().await = Some((reference, Instant::now()));
    }

    async fn clear(&self) {
        *self.slot.write().await = None;
    }
}

impl PrismicClient {
    /// Create a client for `endpoint` (e.g. `https://repo.cdn.prismic.io/api/v2`)
    pub fn new(endpoint: &str, access_token: impl Into<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))?;
        let http_client = Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoint,
            access_token: access_token.into(),
            http_client,
            master_ref: Arc::new(RefCache::new(MASTER_REF_TTL)),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Fetch repository information, including the refs
    pub async fn api_info(&self) -> Result<ApiInfo> {
        let response = self
            .http_client
            .get(self.endpoint.clone())
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await?;

        read_json(response).await
    }

    /// The ref queries read from when no preview ref is given
    ///
    /// Looked up at most once every few seconds, so the queries that
    /// build one page share a single repository lookup.
    pub async fn master_ref(&self) -> Result<String> {
        if let Some(reference) = self.master_ref.get().await {
            return Ok(reference);
        }

        let info = self.api_info().await?;
        let reference = info
            .master_ref()
            .map(str::to_string)
            .ok_or(ContentError::NoMasterRef)?;
        self.master_ref.set(reference.clone()).await;
        Ok(reference)
    }

    fn search_url(&self) -> String {
        format!("{}/documents/search", self.endpoint.as_str().trim_end_matches('/'))
    }
}

impl ContentApi for PrismicClient {
    async fn query(&self, query: &Query) -> Result<ApiPage> {
        let reference = match &query.reference {
            Some(reference) => reference.clone(),
            None => self.master_ref().await?,
        };

        let mut params = query.params();
        params.push(("ref", reference));
        params.push(("access_token", self.access_token.clone()));

        tracing::debug!("Querying content API: {}", query.q());

        let response = self
            .http_client
            .get(self.search_url())
            .query(&params)
            .send()
            .await?;

        // A preview ref that expired or never existed comes back as a client error
        if response.status().is_client_error() {
            if query.reference.is_some() {
                tracing::debug!("Ref rejected with status {}", response.status());
                return Err(ContentError::RefRejected);
            }
            // The cached master ref may have been replaced by a newer release
            self.master_ref.clear().await;
        }

        read_json(response).await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiPage> {
        let url = Url::parse(cursor)?;
        tracing::debug!("Following cursor {}", url.path());

        let response = self.http_client.get(url).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if status != StatusCode::OK {
        return Err(ContentError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
