//! Executes the directive tokens a model reply carries, in priority order.

use super::Gateway;
use crate::markers::{self, Directive, ParsedReply};
use rand::seq::SliceRandom;
use sable_core::message::{IncomingMessage, OutboundMedia};
use sable_media::{MediaFormat, SearchKind, SearchResult};
use sable_memory::Profile;
use tracing::{info, warn};

pub(super) const OFFLINE_NOTICE: &str =
    "Sorry, I didn't get that. Type *menu* for options. The owner is currently offline, please wait.";
pub(super) const FALLBACK_NOTICE: &str =
    "Sorry, I didn't get that. Type *menu* to see what I can do.";

const OFFLINE_KEYWORDS: &[&str] = &["menu", "help", "admin", "owner"];

fn format_results(header: &str, icon: &str, results: &[SearchResult]) -> String {
    let links = results
        .iter()
        .map(|r| format!("• *{}*\n  {icon} {}", r.title, r.url))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("\n\n{header}\n\n{links}")
}

impl Gateway {
    /// Walk `parsed.directives` and send whatever they produce.
    ///
    /// Terminal directives return early; everything else edits `text`, which
    /// goes out last when it is not empty.
    pub(super) async fn execute_directives(
        &self,
        incoming: &IncomingMessage,
        prompt: &str,
        parsed: ParsedReply,
        profile: &mut Profile,
    ) {
        let sender = incoming.sender_id.as_str();
        let ParsedReply {
            mut text,
            directives,
        } = parsed;

        for directive in directives {
            let terminal = directive.is_terminal();
            match directive {
                Directive::MemoryReset => {
                    info!("memory reset for {sender}");
                    self.ai.reset(sender).await;
                }
                Directive::DeepResearch(query) => {
                    self.deep_research(incoming, &query).await;
                }
                Directive::NotifyOwnerOffline => {
                    let lower = prompt.to_lowercase();
                    if OFFLINE_KEYWORDS.iter().any(|k| lower.contains(k)) {
                        self.send_text(incoming, OFFLINE_NOTICE).await;
                    } else if !text.is_empty() {
                        self.send_text(incoming, &text).await;
                    }
                }
                Directive::Gif(query) => {
                    let url = self.media.resolve_gif(&query).await;
                    let sent = match self.media.fetch_bytes(&url).await {
                        Ok(bytes) => {
                            self.send_media(
                                incoming,
                                OutboundMedia::Image {
                                    bytes,
                                    caption: text.clone(),
                                },
                            )
                            .await
                        }
                        Err(e) => {
                            warn!("gif fetch failed: {e}");
                            false
                        }
                    };
                    if !sent && !text.is_empty() {
                        self.send_text(incoming, &text).await;
                    }
                }
                Directive::Forward { phone, message } => match markers::forward_jid(&phone) {
                    Some(jid) => {
                        info!("forwarding message from {sender} to {jid}");
                        self.send_text_to(incoming, &jid, &message).await;
                    }
                    None => warn!("forward target '{phone}' has no digits"),
                },
                Directive::OwnerPhoto => {
                    self.send_owner_photo(incoming).await;
                }
                Directive::WebSearch(query) => {
                    let results = self.media.deep_search(&query, SearchKind::Web).await;
                    if !results.is_empty() {
                        let header = format!("🌐 *Deep Search Results for \"{query}\":*");
                        text.push_str(&format_results(&header, "🔗", &results));
                    }
                }
                Directive::VideoSearch(query) => {
                    let results = self.media.deep_search(&query, SearchKind::Video).await;
                    if !results.is_empty() {
                        let header = format!("🎬 *Deep Video Search for \"{query}\":*");
                        text.push_str(&format_results(&header, "🎬", &results));
                    }
                }
                Directive::Reaction(emoji) => {
                    self.react(incoming, &emoji).await;
                }
                Directive::NewLead { name, project } => {
                    match self.leads.add(sender, &name, &project).await {
                        Ok(true) => {
                            info!("new lead {name} ({sender}): {project}");
                            profile.relationship = "Lead".to_string();
                            profile.notes = format!("Interested in: {project}");
                            if let Err(e) = self.profiles.save(sender, profile).await {
                                warn!("failed to save lead profile for {sender}: {e}");
                            }
                        }
                        Ok(false) => {}
                        Err(e) => warn!("failed to record lead for {sender}: {e}"),
                    }
                }
                Directive::ImageSearch { query, count } => {
                    self.image_search(incoming, &query, count, &mut text).await;
                }
                Directive::SongSearch(query) => {
                    self.deliver_download(incoming, &query, MediaFormat::Audio, Some(&mut text))
                        .await;
                }
                Directive::VideoDownload(query) => {
                    self.deliver_download(incoming, &query, MediaFormat::Video, Some(&mut text))
                        .await;
                }
                Directive::Fallback => {
                    self.send_text(incoming, FALLBACK_NOTICE).await;
                }
            }
            if terminal {
                return;
            }
        }

        let text = text.trim();
        if !text.is_empty() {
            self.send_text(incoming, text).await;
        }
    }

    async fn deep_research(&self, incoming: &IncomingMessage, query: &str) {
        info!("deep research: {query}");
        let research = self.media.research(query).await;
        let synthesis = self.ai.synthesize(query, &research.findings()).await;
        self.send_text(incoming, synthesis.trim()).await;

        for url in &research.images {
            match self.media.fetch_bytes(url).await {
                Ok(bytes) => {
                    let caption = format!("🖼️ Research Image\n🔗 Source: {url}");
                    if self
                        .send_media(incoming, OutboundMedia::Image { bytes, caption })
                        .await
                    {
                        break;
                    }
                }
                Err(e) => warn!("skipping research image: {e}"),
            }
        }

        if let Some(top) = research.video.first() {
            self.send_text(incoming, &format!("🎬 *Video Found:* {}", top.url))
                .await;
        }
    }

    async fn send_owner_photo(&self, incoming: &IncomingMessage) {
        let choice = self
            .persona
            .owner_photos
            .choose(&mut rand::thread_rng())
            .cloned();
        let Some(photo) = choice else {
            warn!("owner photo requested but none are configured");
            return;
        };
        let path = self.data_dir.join(&photo);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let caption = format!(
                    "💎 Here is a photo of the owner, *{}*.",
                    self.persona.owner_name
                );
                self.send_media(incoming, OutboundMedia::Image { bytes, caption })
                    .await;
            }
            Err(e) => warn!("failed to read owner photo {}: {e}", path.display()),
        }
    }

    async fn react(&self, incoming: &IncomingMessage, emoji: &str) {
        let Some(message_id) = incoming.platform_id.as_deref() else {
            return;
        };
        let Some(channel) = self.channel_for(incoming) else {
            return;
        };
        if let Err(e) = channel
            .send_reaction(Self::reply_target(incoming), message_id, emoji)
            .await
        {
            warn!("reaction failed: {e}");
        }
    }

    /// Fetch candidates until `count` images went out.
    async fn image_search(
        &self,
        incoming: &IncomingMessage,
        query: &str,
        count: usize,
        text: &mut String,
    ) {
        let urls = self.media.search_web_images(query, count + 3).await;
        if urls.is_empty() {
            text.push_str(&format!(
                "\n\n_(System Note: I searched for \"{query}\" on the web but found no results.)_"
            ));
            return;
        }

        let mut sent = 0;
        for url in &urls {
            if sent >= count {
                break;
            }
            match self.media.fetch_bytes(url).await {
                Ok(bytes) => {
                    let caption = format!("🖼️ Found from Web\n🔗 Source: {url}");
                    if self
                        .send_media(incoming, OutboundMedia::Image { bytes, caption })
                        .await
                    {
                        sent += 1;
                    }
                }
                Err(e) => warn!("skipping broken image url: {e}"),
            }
        }

        if sent == 0 {
            text.push_str(&format!(
                "\n\n_(System Note: Tried to send images for \"{query}\", but all links were broken.)_"
            ));
        }
    }
}
