//! Web, video and image search by scraping public HTML endpoints.

use crate::MediaClient;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{info, warn};

const MAX_RESULTS: usize = 5;

static IMAGE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(https?://[^"'\s\\]+\.(?:jpg|jpeg|png|webp|gif|bmp|svg))(?:\?[^"'\s\\]*)?"#)
        .expect("image url pattern")
});

static VQD_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"vqd=["']?([\d-]+)["']?"#).expect("vqd pattern"));

const SKIP_IMAGE_HOSTS: &[&str] = &["google", "gstatic", "encrypted", "favicon", "logo"];

/// What a deep search looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Web,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
}

/// Combined output of [`MediaClient::research`].
#[derive(Debug, Clone, Default)]
pub struct Research {
    pub query: String,
    pub web: Vec<SearchResult>,
    pub video: Vec<SearchResult>,
    pub images: Vec<String>,
}

impl Research {
    /// Plain-text digest handed to the model for synthesis.
    pub fn findings(&self) -> String {
        let mut out = String::new();
        if !self.web.is_empty() {
            out.push_str("Web results:\n");
            for r in &self.web {
                out.push_str(&format!("- {} ({})\n", r.title, r.url));
            }
        }
        if !self.video.is_empty() {
            out.push_str("Videos:\n");
            for r in &self.video {
                out.push_str(&format!("- {} ({})\n", r.title, r.url));
            }
        }
        if out.is_empty() {
            out.push_str("No results found.");
        }
        out
    }
}

#[derive(Deserialize)]
struct DdgImages {
    #[serde(default)]
    results: Vec<DdgImage>,
}

#[derive(Deserialize)]
struct DdgImage {
    image: String,
}

/// Parse DuckDuckGo's HTML results page into at most five links.
pub fn parse_ddg_results(html: &str) -> Vec<SearchResult> {
    let Ok(selector) = Selector::parse("a.result__a") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let title = a.text().collect::<String>().trim().to_string();
            Some(SearchResult {
                title,
                url: unwrap_ddg_redirect(href),
            })
        })
        .take(MAX_RESULTS)
        .collect()
}

/// DuckDuckGo wraps result links as `//duckduckgo.com/l/?uddg=<encoded>&...`.
pub fn unwrap_ddg_redirect(href: &str) -> String {
    if let Some((_, rest)) = href.split_once("uddg=") {
        let encoded = rest.split('&').next().unwrap_or(rest);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    href.to_string()
}

/// Pull candidate image URLs out of a Google Images page.
pub fn extract_image_urls(html: &str, limit: usize) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for cap in IMAGE_URL.captures_iter(html) {
        let url = &cap[1];
        if SKIP_IMAGE_HOSTS.iter().any(|s| url.contains(s)) {
            continue;
        }
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
        if urls.len() >= limit {
            break;
        }
    }
    urls
}

pub fn extract_vqd(html: &str) -> Option<String> {
    VQD_TOKEN.captures(html).map(|c| c[1].to_string())
}

fn loremflickr_url(query: &str) -> String {
    let lock: u32 = rand::thread_rng().gen_range(0..1_000_000);
    let topic = query.trim().replace(' ', "_");
    format!(
        "https://loremflickr.com/1280/720/{}?lock={lock}",
        urlencoding::encode(&topic)
    )
}

impl MediaClient {
    /// Search DuckDuckGo. Network or parse failures yield an empty list.
    pub async fn deep_search(&self, query: &str, kind: SearchKind) -> Vec<SearchResult> {
        let mut q = query.trim().to_string();
        if kind == SearchKind::Video {
            q.push_str(" site:youtube.com");
        }
        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(&q)
        );
        info!("deep search ({kind:?}): {query}");
        match self.fetch_text(&url).await {
            Ok(html) => parse_ddg_results(&html),
            Err(e) => {
                warn!("search failed: {e}");
                Vec::new()
            }
        }
    }

    /// Find up to `count` real image URLs. Always returns at least one URL.
    pub async fn search_web_images(&self, query: &str, count: usize) -> Vec<String> {
        let count = count.max(1);
        let encoded = urlencoding::encode(query.trim()).into_owned();

        let google = format!("https://www.google.com/search?q={encoded}&tbm=isch&sclient=img");
        match self.fetch_text(&google).await {
            Ok(html) => {
                let urls = extract_image_urls(&html, count);
                if !urls.is_empty() {
                    return urls;
                }
                warn!("image search: google returned nothing for '{query}', trying duckduckgo");
            }
            Err(e) => warn!("image search: google failed: {e}"),
        }

        match self.ddg_images(&encoded, count).await {
            Some(urls) if !urls.is_empty() => urls,
            _ => {
                warn!("image search: all strategies failed for '{query}'");
                vec![loremflickr_url(query)]
            }
        }
    }

    async fn ddg_images(&self, encoded: &str, count: usize) -> Option<Vec<String>> {
        let page = self
            .fetch_text(&format!(
                "https://duckduckgo.com/?q={encoded}&iax=images&ia=images"
            ))
            .await
            .ok()?;
        let vqd = extract_vqd(&page)?;
        let resp = self
            .http()
            .get(format!(
                "https://duckduckgo.com/i.js?q={encoded}&o=json&vqd={vqd}&f=,,,,,&p=1"
            ))
            .header("Referer", "https://duckduckgo.com/")
            .header("User-Agent", self.user_agent())
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let data: DdgImages = resp.json().await.ok()?;
        Some(data.results.into_iter().take(count).map(|r| r.image).collect())
    }

    /// Web, video and image search run concurrently.
    pub async fn research(&self, query: &str) -> Research {
        let (web, video, images) = tokio::join!(
            self.deep_search(query, SearchKind::Web),
            self.deep_search(query, SearchKind::Video),
            self.search_web_images(query, 3),
        );
        Research {
            query: query.to_string(),
            web,
            video,
            images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DDG_HTML: &str = r#"
        <html><body>
          <div class="result">
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">The <b>Rust</b> Language</a>
          </div>
          <div class="result">
            <a class="result__a" href="https://doc.rust-lang.org/book/">The Book</a>
          </div>
          <a class="other" href="https://ignored.example">nope</a>
        </body></html>
    "#;

    #[test]
    fn test_parse_ddg_results() {
        let results = parse_ddg_results(DDG_HTML);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "The Rust Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert_eq!(results[1].url, "https://doc.rust-lang.org/book/");
    }

    #[test]
    fn test_parse_ddg_results_caps_at_five() {
        let mut html = String::from("<html><body>");
        for i in 0..9 {
            html.push_str(&format!(
                r#"<a class="result__a" href="https://e.com/{i}">r{i}</a>"#
            ));
        }
        html.push_str("</body></html>");
        assert_eq!(parse_ddg_results(&html).len(), 5);
    }

    #[test]
    fn test_unwrap_ddg_redirect_passthrough() {
        assert_eq!(unwrap_ddg_redirect("https://a.b/c"), "https://a.b/c");
    }

    #[test]
    fn test_extract_image_urls_skips_google_assets() {
        let html = r#"
            ["https://www.gstatic.com/images/a.png",
             "https://cdn.example.com/cat.jpg?w=300",
             "https://cdn.example.com/cat.jpg",
             "https://site.org/logo.png",
             "https://img.example.net/dog.webp"]
        "#;
        let urls = extract_image_urls(html, 5);
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/cat.jpg".to_string(),
                "https://img.example.net/dog.webp".to_string()
            ]
        );
        assert_eq!(extract_image_urls(html, 1).len(), 1);
    }

    #[test]
    fn test_extract_vqd() {
        assert_eq!(
            extract_vqd(r#"...vqd="4-123456789"..."#).as_deref(),
            Some("4-123456789")
        );
        assert_eq!(extract_vqd("nothing here"), None);
    }

    #[test]
    fn test_loremflickr_fallback_url() {
        let url = loremflickr_url(" red car ");
        assert!(url.starts_with("https://loremflickr.com/1280/720/red_car?lock="));
    }

    #[test]
    fn test_research_findings() {
        let empty = Research::default();
        assert_eq!(empty.findings(), "No results found.");
        let r = Research {
            query: "q".into(),
            web: vec![SearchResult {
                title: "T".into(),
                url: "https://t".into(),
            }],
            ..Default::default()
        };
        assert!(r.findings().contains("- T (https://t)"));
    }
}
