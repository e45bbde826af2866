//! Rendered pages kept in memory between requests
//!
//! Pages are served from here as if they were pre-rendered files. An entry
//! may carry an expiry; once it passes, the stale copy keeps being served
//! while a single background task renders a fresh one.
//!
//! Paths that produced no page (unknown slugs, upstream failures) are kept
//! apart as short-lived misses. Misses are capped so arbitrary slugs cannot
//! grow the store.

use axum::http::StatusCode;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// Most misses remembered at once
pub const MAX_MISSES: usize = 1024;

/// A stored page
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    pub status: StatusCode,
    pub html: String,
    /// True once the entry's revalidation period has passed
    pub stale: bool,
}

/// Why a path has nothing stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    NotFound,
    Failed,
}

#[derive(Debug)]
struct Entry {
    status: StatusCode,
    html: String,
    expires_at: Option<Instant>,
}

#[derive(Debug)]
struct MissEntry {
    miss: Miss,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct PageStore {
    pages: RwLock<HashMap<String, Entry>>,
    misses: Mutex<HashMap<String, MissEntry>>,
    miss_limit: usize,
    in_flight: Mutex<HashSet<String>>,
}

impl Default for PageStore {
    fn default() -> Self {
        Self::with_miss_limit(MAX_MISSES)
    }
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_miss_limit(miss_limit: usize) -> Self {
        Self {
            pages: RwLock::default(),
            misses: Mutex::default(),
            miss_limit: miss_limit.max(1),
            in_flight: Mutex::default(),
        }
    }

    pub async fn get(&self, path: &str) -> Option<CachedPage> {
        let pages = self.pages.read().await;
        let entry = pages.get(path)?;
        Some(CachedPage {
            status: entry.status,
            html: entry.html.clone(),
            stale: entry
                .expires_at
                .is_some_and(|expires_at| Instant::now() >= expires_at),
        })
    }

    /// Store a page; `revalidate` of `None` keeps it until replaced
    pub async fn insert(
        &self,
        path: impl Into<String>,
        status: StatusCode,
        html: String,
        revalidate: Option<Duration>,
    ) {
        let path = path.into();
        let entry = Entry {
            status,
            html,
            expires_at: revalidate.map(|after| Instant::now() + after),
        };
        self.misses.lock().await.remove(&path);
        self.pages.write().await.insert(path, entry);
    }

    pub async fn len(&self) -> usize {
        self.pages.read().await.len()
    }

    /// Remember that `path` produced no page, for `ttl`
    ///
    /// Expired misses are dropped first; if the store is still full the miss
    /// closest to expiry makes room.
    pub async fn record_miss(&self, path: impl Into<String>, miss: Miss, ttl: Duration) {
        let path = path.into();
        let now = Instant::now();
        let mut misses = self.misses.lock().await;

        if !misses.contains_key(&path) && misses.len() >= self.miss_limit {
            misses.retain(|_, entry| entry.expires_at > now);
            if misses.len() >= self.miss_limit {
                let oldest = misses
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(path, _)| path.clone());
                if let Some(oldest) = oldest {
                    misses.remove(&oldest);
                }
            }
        }

        misses.insert(
            path,
            MissEntry {
                miss,
                expires_at: now + ttl,
            },
        );
    }

    /// The live miss for `path`, if any
    pub async fn miss(&self, path: &str) -> Option<Miss> {
        let mut misses = self.misses.lock().await;
        let entry = misses.get(path)?;
        if Instant::now() >= entry.expires_at {
            misses.remove(path);
            return None;
        }
        Some(entry.miss)
    }

    pub async fn miss_count(&self) -> usize {
        self.misses.lock().await.len()
    }

    /// Claim the right to render `path`; false when another task holds it
    pub async fn begin(&self, path: &str) -> bool {
        self.in_flight.lock().await.insert(path.to_string())
    }

    pub async fn finish(&self, path: &str) {
        self.in_flight.lock().await.remove(path);
    }
}
