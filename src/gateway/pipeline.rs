//! Message processing pipeline: the main handle_message flow.

use super::Gateway;
use crate::commands::{self, Command, CommandContext};
use crate::markers::{self, postprocess};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sable_core::{
    context::ImageInput,
    message::{Attachment, AttachmentType, IncomingMessage, OutboundMedia},
};
use sable_media::MediaFormat;
use sable_memory::{MediaKind, Profile};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(super) const IMAGE_PROMPT: &str = "Is photo ko dekho aur react karo.";
pub(super) const GIF_PROMPT: &str = "Is GIF ko dekho aur react karo.";
pub(super) const VIDEO_PROMPT: &str = "Is video ko dekho aur iska breakdown do.";

/// What goes to the model for one inbound message.
#[derive(Debug)]
pub(super) struct TurnInput {
    pub prompt: String,
    pub image: Option<ImageInput>,
}

/// `[USER_REPLY_TO: "..."] ` when the message quotes another one.
pub(super) fn quoted_prefix(quoted: Option<&str>) -> String {
    match quoted {
        Some(q) if !q.trim().is_empty() => format!("[USER_REPLY_TO: \"{}\"] ", q.trim()),
        _ => String::new(),
    }
}

/// Build the prompt for everything except voice notes, which need transcription first.
pub(super) fn build_turn(incoming: &IncomingMessage) -> TurnInput {
    let text = incoming.text.trim();
    let mut turn = TurnInput {
        prompt: format!("{}{text}", quoted_prefix(incoming.quoted_text.as_deref())),
        image: None,
    };

    if let Some(img) = incoming.attachment(AttachmentType::Image) {
        turn.image = img.data.as_ref().map(|bytes| ImageInput {
            mime_type: img
                .mime_type
                .clone()
                .unwrap_or_else(|| "image/jpeg".to_string()),
            base64: BASE64.encode(bytes),
        });
        if text.is_empty() {
            turn.prompt = IMAGE_PROMPT.to_string();
        }
    } else if let Some(video) = incoming.attachment(AttachmentType::Video) {
        if text.is_empty() {
            turn.prompt = if video.gif_playback {
                GIF_PROMPT
            } else {
                VIDEO_PROMPT
            }
            .to_string();
        }
    }
    turn
}

fn preview(text: &str) -> String {
    if text.chars().count() > 60 {
        let truncated: String = text.chars().take(60).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

impl Gateway {
    /// Process a single incoming message through the full pipeline.
    ///
    /// Errors stop here: everything is logged, nothing propagates.
    pub(super) async fn handle_message(self: &Arc<Self>, incoming: IncomingMessage) {
        let sender = incoming.sender_id.as_str();
        let user_name = incoming
            .sender_name
            .clone()
            .unwrap_or_else(|| "User".to_string());
        info!(
            "[{}] {} says: {}",
            incoming.channel,
            user_name,
            preview(&incoming.text)
        );

        // --- 1. AUDIT ---
        self.audit_in(sender, &incoming.text).await;

        // --- 2. PROFILE ---
        let mut profile = match self.profiles.get_or_create(sender, &user_name).await {
            Ok(p) => p,
            Err(e) => {
                warn!("profile load failed for {sender}: {e}");
                Profile::new(&user_name)
            }
        };

        // --- 3. COUNTERS ---
        let stats = self.stats.record_message(sender).await;
        debug!("{sender} has sent {} messages", stats.messages);

        // --- 4. MEDIA AUTO-SAVE ---
        for attachment in &incoming.attachments {
            match attachment.file_type {
                AttachmentType::Image => self.stats.record_media(sender, MediaKind::Image).await,
                AttachmentType::Video => self.stats.record_media(sender, MediaKind::Video).await,
                _ => {}
            }
            if let Err(e) = self.save_attachment(attachment).await {
                warn!("failed to save media from {sender}: {e}");
            }
        }

        // --- 5. COMMAND DISPATCH ---
        let is_owner = self.persona.is_owner(sender);
        if let Some(cmd) = Command::parse(&incoming.text, is_owner) {
            self.run_command(&incoming, cmd, &profile).await;
            return;
        }

        // --- 6. MODEL TURN ---
        if let Some(channel) = self.channel_for(&incoming) {
            if let Err(e) = channel.send_typing(Self::reply_target(&incoming)).await {
                debug!("typing indicator failed: {e}");
            }
        }

        let mut turn = build_turn(&incoming);
        if incoming.attachment(AttachmentType::Image).is_none()
            && incoming.attachment(AttachmentType::Video).is_none()
        {
            if let Some(voice) = incoming.attachment(AttachmentType::Audio) {
                turn.prompt = match voice.data.as_deref() {
                    Some(bytes) => self.ai.transcribe(bytes).await,
                    None => None,
                }
                .unwrap_or_else(|| {
                    format!(
                        "{}, maine voice message bheja hai par error aa raha hai.",
                        self.persona.name
                    )
                });
            }
        }
        if turn.prompt.trim().is_empty() && turn.image.is_none() {
            turn.prompt = format!("Hi {}!", self.persona.name);
        }

        let raw = self
            .ai
            .reply(sender, &user_name, &turn.prompt, turn.image)
            .await;
        let cleaned = postprocess::clean_reply(&raw, &turn.prompt, &self.persona);
        let parsed = markers::parse_reply(&cleaned);
        if !parsed.directives.is_empty() {
            info!("directives for {sender}: {:?}", parsed.directives);
        }

        self.execute_directives(&incoming, &turn.prompt, parsed, &mut profile)
            .await;
    }

    async fn run_command(self: &Arc<Self>, incoming: &IncomingMessage, cmd: Command, profile: &Profile) {
        let sender = incoming.sender_id.as_str();
        info!("command from {sender}: {cmd:?}");

        let format = match &cmd {
            Command::Song(_) => Some(MediaFormat::Audio),
            Command::Video(_) => Some(MediaFormat::Video),
            _ => None,
        };
        let query = match &cmd {
            Command::Song(q) | Command::Video(q) => q.clone(),
            _ => String::new(),
        };
        let is_shutdown = cmd == Command::Shutdown;

        let ctx = CommandContext {
            sender_id: sender,
            persona: &self.persona,
            profile,
            stats: &self.stats,
            leads: &self.leads,
            sandbox: &self.sandbox,
            uptime: &self.uptime,
        };
        let response = commands::handle(cmd, &ctx).await;
        self.send_text(incoming, &response).await;

        if let Some(format) = format {
            self.deliver_download(incoming, &query, format, None).await;
        } else if is_shutdown {
            info!("owner {sender} requested shutdown");
            self.schedule_shutdown();
        }
    }

    /// Run a download chain and send the result.
    ///
    /// With `note`, success and failure are appended to it instead of being
    /// sent as their own text message.
    pub(super) async fn deliver_download(
        &self,
        incoming: &IncomingMessage,
        query: &str,
        format: MediaFormat,
        note: Option<&mut String>,
    ) {
        let media = match self.media.download(query, format).await {
            Ok(bytes) => {
                info!("downloaded {format:?} for '{query}' ({} bytes)", bytes.len());
                Some(match format {
                    MediaFormat::Audio => OutboundMedia::Audio {
                        bytes,
                        mime: "audio/mpeg".to_string(),
                    },
                    MediaFormat::Video => OutboundMedia::Video {
                        bytes,
                        caption: String::new(),
                        mime: "video/mp4".to_string(),
                    },
                })
            }
            Err(e) => {
                warn!("download chain failed for '{query}': {e}");
                None
            }
        };
        let sent = match media {
            Some(media) => self.send_media(incoming, media).await,
            None => false,
        };

        match (note, sent) {
            (Some(note), true) => {
                let icon = match format {
                    MediaFormat::Audio => "🎵 _Sent audio",
                    MediaFormat::Video => "🎬 _Sent video",
                };
                note.push_str(&format!("\n\n{icon} for: {query}_"));
            }
            (Some(note), false) => {
                let what = match format {
                    MediaFormat::Audio => "audio",
                    MediaFormat::Video => "video",
                };
                note.push_str(&format!(
                    "\n\n_(System Note: Sorry yaar, the {what} download for \"{query}\" failed right now.)_"
                ));
            }
            (None, true) => {}
            (None, false) => {
                self.send_text(incoming, &commands::download_failed(format))
                    .await;
            }
        }
    }

    /// Write a received attachment to `{data_dir}/media/download_<millis>.<ext>`.
    async fn save_attachment(&self, attachment: &Attachment) -> std::io::Result<Option<PathBuf>> {
        let Some(bytes) = attachment.data.as_deref() else {
            return Ok(None);
        };
        let dir = self.data_dir.join("media");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!(
            "download_{}.{}",
            chrono::Utc::now().timestamp_millis(),
            attachment.file_type.extension()
        ));
        tokio::fs::write(&path, bytes).await?;
        info!("saved media to {}", path.display());
        Ok(Some(path))
    }
}
