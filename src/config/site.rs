//! Site configuration (_config.yml)

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::content::WordCounting;

/// Environment variable holding the content API endpoint
pub const ENV_ENDPOINT: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable holding the content API access token
pub const ENV_ACCESS_TOKEN: &str = "PRISMIC_ACCESS_TOKEN";
/// Environment variable holding the preview cookie signing key
pub const ENV_PREVIEW_SECRET: &str = "PREVIEW_SECRET";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Content API
    #[serde(default)]
    pub prismic: PrismicConfig,

    // Pagination
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Seconds before the home page is regenerated
    pub revalidate: u64,

    #[serde(default)]
    pub reading: ReadingConfig,

    #[serde(default)]
    pub comments: CommentsConfig,

    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            prismic: PrismicConfig::default(),
            pagination: PaginationConfig::default(),
            revalidate: 60 * 30,
            reading: ReadingConfig::default(),
            comments: CommentsConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Override secrets from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override secrets from any key/value source
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(endpoint) = value(ENV_ENDPOINT) {
            self.prismic.endpoint = endpoint;
        }
        if let Some(token) = value(ENV_ACCESS_TOKEN) {
            self.prismic.access_token = token;
        }
        if let Some(secret) = value(ENV_PREVIEW_SECRET) {
            self.preview.secret = Some(secret);
        }
    }

    /// Check everything the site needs before talking to the content API
    pub fn validate(&self) -> Result<()> {
        if self.prismic.endpoint.trim().is_empty() {
            bail!(
                "Content API endpoint is not configured (set prismic.endpoint or {})",
                ENV_ENDPOINT
            );
        }
        if self.prismic.access_token.trim().is_empty() {
            bail!(
                "Content API access token is not configured (set prismic.access_token or {})",
                ENV_ACCESS_TOKEN
            );
        }
        if self.reading.words_per_minute == 0 {
            bail!("reading.words_per_minute must be greater than zero");
        }
        if self.pagination.per_page == 0 || self.pagination.static_paths == 0 {
            bail!("pagination sizes must be greater than zero");
        }
        self.tz()?;
        Ok(())
    }

    /// Parsed display timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone {:?}: {}", self.timezone, e))
    }

    pub fn revalidate_after(&self) -> Duration {
        Duration::from_secs(self.revalidate)
    }
}

/// Content API connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    pub endpoint: String,
    pub access_token: String,
}

/// Page sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Posts per page on the home page
    pub per_page: usize,
    /// Posts pre-rendered at generation time
    pub static_paths: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            per_page: 2,
            static_paths: 4,
        }
    }
}

/// Reading time estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub words_per_minute: usize,
    pub counting: WordCounting,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
            counting: WordCounting::Words,
        }
    }
}

/// utterances comment widget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub script: String,
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
    pub label: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            script: "https://utteranc.es/client.js".to_string(),
            repo: "vnl13/c3-desafio01-trilha-reactjs".to_string(),
            issue_term: "pathname".to_string(),
            theme: "dark-blue".to_string(),
            label: "comment".to_string(),
        }
    }
}

/// Preview cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub cookie_name: String,
    /// Signing key; a random per-process key is used when absent
    pub secret: Option<String>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            cookie_name: "spacetraveling_preview".to_string(),
            secret: None,
        }
    }
}
