//! Audio/video downloads for a free-text query.
//!
//! The query is resolved to a YouTube video, then a chain of public
//! converter APIs is tried in order until one yields a fetchable link.
//! Cobalt is always the last resort.

use crate::MediaClient;
use once_cell::sync::Lazy;
use regex::Regex;
use sable_core::error::SableError;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

static VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""videoId":"([A-Za-z0-9_-]{11})""#).expect("video id pattern"));

static VIDEO_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""title":\{"runs":\[\{"text":"((?:[^"\\]|\\.)*)""#).expect("title pattern")
});

const COBALT_ENDPOINT: &str = "https://api.cobalt.tools/";

/// First video found for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoHit {
    pub id: String,
    pub title: Option<String>,
}

impl VideoHit {
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Audio,
    Video,
}

/// A converter API: `endpoint` takes the video URL appended, `extract`
/// pulls the download link out of its JSON response.
struct LinkProvider {
    name: &'static str,
    endpoint: &'static str,
    extract: fn(&Value) -> Option<String>,
}

fn str_at(v: &Value, pointer: &str) -> Option<String> {
    v.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn maher_link(v: &Value) -> Option<String> {
    (v.get("status").and_then(Value::as_i64) == Some(200))
        .then(|| str_at(v, "/result/link"))
        .flatten()
}

fn bk9_link(v: &Value) -> Option<String> {
    let ok = match v.get("status") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => false,
        Some(_) => true,
    };
    ok.then(|| str_at(v, "/BK9/download/url")).flatten()
}

fn top_url(v: &Value) -> Option<String> {
    str_at(v, "/url")
}

fn data_dl(v: &Value) -> Option<String> {
    str_at(v, "/data/dl")
}

const AUDIO_PROVIDERS: &[LinkProvider] = &[
    LinkProvider {
        name: "maher-zubair",
        endpoint: "https://api.maher-zubair.tech/download/ytmp3?url=",
        extract: maher_link,
    },
    LinkProvider {
        name: "bk9",
        endpoint: "https://bk9.fun/download/youtube?url=",
        extract: bk9_link,
    },
    LinkProvider {
        name: "ryzendesu",
        endpoint: "https://api.ryzendesu.vip/api/downloader/ytmp3?url=",
        extract: top_url,
    },
    LinkProvider {
        name: "siputzx",
        endpoint: "https://api.siputzx.my.id/api/d/ytmp3?url=",
        extract: data_dl,
    },
    LinkProvider {
        name: "agatz",
        endpoint: "https://api.agatz.xyz/api/ytmp3?url=",
        extract: data_dl,
    },
];

const VIDEO_PROVIDERS: &[LinkProvider] = &[
    LinkProvider {
        name: "bk9",
        endpoint: "https://bk9.fun/download/youtube?url=",
        extract: bk9_link,
    },
    LinkProvider {
        name: "maher-zubair",
        endpoint: "https://api.maher-zubair.tech/download/ytmp4?url=",
        extract: maher_link,
    },
    LinkProvider {
        name: "siputzx",
        endpoint: "https://api.siputzx.my.id/api/d/ytmp4?url=",
        extract: data_dl,
    },
    LinkProvider {
        name: "agatz",
        endpoint: "https://api.agatz.xyz/api/ytmp4?url=",
        extract: data_dl,
    },
];

/// First video id (and title, when present) on a YouTube results page.
pub fn parse_youtube_results(html: &str) -> Option<VideoHit> {
    let id = VIDEO_ID.captures(html)?[1].to_string();
    let title = VIDEO_TITLE
        .captures(html)
        .map(|c| c[1].replace("\\u0026", "&").replace("\\\"", "\""));
    Some(VideoHit { id, title })
}

impl MediaClient {
    /// Look up the top YouTube result for `query`.
    pub async fn find_video(&self, query: &str) -> Option<VideoHit> {
        let url = format!(
            "https://www.youtube.com/results?search_query={}",
            urlencoding::encode(query.trim())
        );
        match self.fetch_text(&url).await {
            Ok(html) => parse_youtube_results(&html),
            Err(e) => {
                warn!("video lookup failed: {e}");
                None
            }
        }
    }

    /// Find `query` on YouTube and run the provider chain for `format`.
    pub async fn download(&self, query: &str, format: MediaFormat) -> Result<Vec<u8>, SableError> {
        let hit = self
            .find_video(query)
            .await
            .ok_or_else(|| SableError::Media(format!("no video found for '{query}'")))?;
        let target = hit.url();
        info!(
            "{format:?} download: '{}' -> {target}",
            hit.title.as_deref().unwrap_or(query)
        );

        let providers = match format {
            MediaFormat::Audio => AUDIO_PROVIDERS,
            MediaFormat::Video => VIDEO_PROVIDERS,
        };
        for provider in providers {
            debug!("trying {}", provider.name);
            let Some(link) = self.provider_link(provider, &target).await else {
                continue;
            };
            match self.fetch_bytes(&link).await {
                Ok(bytes) => {
                    info!("{format:?} download via {}: {} bytes", provider.name, bytes.len());
                    return Ok(bytes);
                }
                Err(e) => debug!("{} link unusable: {e}", provider.name),
            }
        }

        debug!("trying cobalt");
        if let Some(link) = self.cobalt_link(&target, format).await {
            if let Ok(bytes) = self.fetch_bytes(&link).await {
                return Ok(bytes);
            }
        }

        Err(SableError::Media(format!(
            "all providers failed for {format:?} '{query}'"
        )))
    }

    async fn provider_link(&self, provider: &LinkProvider, target: &str) -> Option<String> {
        let resp = self
            .http()
            .get(format!("{}{target}", provider.endpoint))
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body: Value = resp.json().await.ok()?;
        (provider.extract)(&body)
    }

    async fn cobalt_link(&self, target: &str, format: MediaFormat) -> Option<String> {
        let mut body = json!({ "url": target });
        if format == MediaFormat::Audio {
            body["isAudioOnly"] = Value::Bool(true);
        }
        let resp = self
            .http()
            .post(COBALT_ENDPOINT)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let data: Value = resp.json().await.ok()?;
        top_url(&data)
    }
}
