//! Reaction GIF lookup.

use crate::MediaClient;
use serde::Deserialize;
use tracing::{info, warn};

const CATEGORIES: &[&str] = &[
    "smile", "wave", "happy", "dance", "laugh", "hug", "wink", "pat", "bonk", "yeet", "bully",
    "slap", "kill", "cringe", "cuddle", "cry",
];

/// Last resort when both GIF APIs are down.
pub const FALLBACK_GIF: &str = "https://media.giphy.com/media/3o7TKP9ln2DrM3hAS4/giphy.gif";

#[derive(Deserialize)]
struct GifResponse {
    url: Option<String>,
}

/// Map a free-form query to a category the GIF APIs understand.
pub fn gif_category(query: &str) -> &'static str {
    let q = query.to_lowercase();
    let found = CATEGORIES
        .iter()
        .copied()
        .find(|c| q.contains(c))
        .unwrap_or("smile");
    match found {
        "laugh" => "smile",
        "cringe" => "smug",
        other => other,
    }
}

impl MediaClient {
    /// Resolve a GIF URL for `query`. Never fails.
    pub async fn resolve_gif(&self, query: &str) -> String {
        let category = gif_category(query);
        info!("gif lookup: category {category}");

        let sources = [
            format!("https://api.waifu.pics/sfw/{category}"),
            format!("https://api.otakugif.xyz/gif?reaction={category}"),
        ];
        for source in &sources {
            match self.gif_from(source).await {
                Some(url) => return url,
                None => warn!("gif source failed: {source}"),
            }
        }
        FALLBACK_GIF.to_string()
    }

    async fn gif_from(&self, url: &str) -> Option<String> {
        let resp = self.http().get(url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        resp.json::<GifResponse>().await.ok()?.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gif_category() {
        assert_eq!(gif_category("big HUG for you"), "hug");
        assert_eq!(gif_category("dance party"), "dance");
        assert_eq!(gif_category("lol laugh"), "smile");
        assert_eq!(gif_category("so cringe"), "smug");
        assert_eq!(gif_category("anything else"), "smile");
        assert_eq!(gif_category(""), "smile");
    }
}
