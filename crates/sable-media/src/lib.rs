//! # sable-media
//!
//! Everything Sable fetches from the open web: search results, image URLs,
//! reaction GIFs, and audio/video downloads. No API keys are required; every
//! operation degrades to an empty result or a fallback URL instead of failing
//! loudly, except the download chains which report an error when every
//! provider has been tried.

pub mod download;
pub mod gif;
pub mod search;

pub use download::{MediaFormat, VideoHit};
pub use search::{Research, SearchKind, SearchResult};

use sable_core::{config::MediaConfig, error::SableError};
use std::time::Duration;
use tracing::debug;

/// Shared HTTP client for all media lookups.
#[derive(Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    user_agent: String,
}

impl MediaClient {
    pub fn from_config(config: &MediaConfig) -> Result<Self, SableError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SableError::Media(format!("http client: {e}")))?;
        Ok(Self {
            http,
            user_agent: config.user_agent.clone(),
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET a URL and return the body bytes when the response is a success.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, SableError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SableError::Media(format!("fetch {url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(SableError::Media(format!(
                "fetch {url}: HTTP {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SableError::Media(format!("fetch {url}: {e}")))?;
        debug!("fetched {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }

    /// GET a URL and return the body as text, regardless of status.
    pub(crate) async fn fetch_text(&self, url: &str) -> Result<String, SableError> {
        self.http
            .get(url)
            .send()
            .await
            .map_err(|e| SableError::Media(format!("fetch {url}: {e}")))?
            .text()
            .await
            .map_err(|e| SableError::Media(format!("read {url}: {e}")))
    }
}
