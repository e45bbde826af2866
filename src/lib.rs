//! spacetraveling: a blog front-end for a Prismic repository
//!
//! Posts are fetched from the content API, rendered with embedded Tera
//! templates and either written to disk (`generate`) or served by a small
//! axum server that renders missing pages on demand and supports preview
//! mode.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod preview;
pub mod prismic;
pub mod server;
pub mod templates;

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::generator::Generator;
use crate::preview::PreviewSession;
use crate::prismic::PrismicClient;

/// The main application
#[derive(Clone)]
pub struct Spacetraveling {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets directory
    pub static_dir: PathBuf,
}

impl Spacetraveling {
    /// Create a new instance from a directory
    ///
    /// `_config.yml` is optional; the content API settings can come from
    /// the environment alone.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            static_dir,
        })
    }

    /// Authenticated content API client
    pub fn client(&self) -> Result<PrismicClient> {
        self.config.validate()?;
        PrismicClient::new(&self.config.prismic.endpoint, &self.config.prismic.access_token)
            .with_context(|| format!("Invalid content API endpoint {:?}", self.config.prismic.endpoint))
    }

    pub fn generator(&self) -> Result<Generator<PrismicClient>> {
        Generator::new(Arc::new(self.client()?), self.config.clone())
    }

    /// Preview cookie signer, keyed by `preview.secret` or a random key
    pub fn preview_session(&self) -> Result<PreviewSession> {
        let cookie_name = self.config.preview.cookie_name.clone();
        let session = match &self.config.preview.secret {
            Some(secret) => PreviewSession::new(cookie_name, secret.as_bytes()),
            None => {
                tracing::warn!("No preview secret configured, preview cookies will not survive a restart");
                PreviewSession::with_random_key(cookie_name)
            }
        };
        session.map_err(|e| anyhow!("Invalid preview secret: {}", e))
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
