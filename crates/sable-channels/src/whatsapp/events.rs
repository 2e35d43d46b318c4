//! Incoming WhatsApp message handling: filtering, unwrapping, and forwarding.

use super::WhatsAppChannel;
use sable_core::message::{
    Attachment, AttachmentType, ChannelEvent, IncomingMessage, PresenceStatus, PresenceUpdate,
};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wacore::download::Downloadable;
use wacore::types::presence::ChatPresence;
use waproto::whatsapp::Message;

/// Strip device-sent, ephemeral and view-once wrappers.
pub(super) fn unwrap_message(msg: &Message) -> &Message {
    msg.device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(msg)
}

/// Text body of a message: plain text, extended text, or a media caption.
pub(super) fn message_text(inner: &Message) -> String {
    inner
        .conversation
        .as_deref()
        .or_else(|| {
            inner
                .extended_text_message
                .as_ref()
                .and_then(|e| e.text.as_deref())
        })
        .or_else(|| inner.image_message.as_ref().and_then(|i| i.caption.as_deref()))
        .or_else(|| inner.video_message.as_ref().and_then(|v| v.caption.as_deref()))
        .or_else(|| {
            inner
                .document_message
                .as_ref()
                .and_then(|d| d.caption.as_deref())
        })
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Short description of a quoted message for the prompt prefix.
pub(super) fn describe_quoted(quoted: &Message) -> Option<String> {
    let quoted = unwrap_message(quoted);
    let text = message_text(quoted);
    if !text.is_empty() {
        return Some(text);
    }
    if quoted.image_message.is_some() {
        Some("[An Image]".to_string())
    } else if quoted.video_message.is_some() {
        Some("[A Video]".to_string())
    } else if quoted.audio_message.is_some() {
        Some("[A Voice Note]".to_string())
    } else {
        None
    }
}

/// The message this one replies to, if any.
pub(super) fn quoted_text(inner: &Message) -> Option<String> {
    let ctx = inner
        .extended_text_message
        .as_ref()
        .and_then(|m| m.context_info.as_ref())
        .or_else(|| {
            inner
                .image_message
                .as_ref()
                .and_then(|m| m.context_info.as_ref())
        })
        .or_else(|| {
            inner
                .video_message
                .as_ref()
                .and_then(|m| m.context_info.as_ref())
        })
        .or_else(|| {
            inner
                .audio_message
                .as_ref()
                .and_then(|m| m.context_info.as_ref())
        })?;
    describe_quoted(ctx.quoted_message.as_deref()?)
}

/// Whether an inbound message should be dropped before any processing.
pub(super) fn should_ignore(
    is_from_me: bool,
    is_group: bool,
    ignore_groups: bool,
    phone: &str,
    allowed: &[String],
) -> bool {
    if is_from_me || (is_group && ignore_groups) {
        return true;
    }
    !allowed.is_empty() && !allowed.iter().any(|a| a == phone)
}

/// Presence for an available/unavailable update.
pub(super) fn presence_status(unavailable: bool) -> PresenceStatus {
    if unavailable {
        PresenceStatus::Offline
    } else {
        PresenceStatus::Available
    }
}

/// Presence for a typing update. Pausing means the contact is still online.
pub(super) fn chat_presence_status(state: ChatPresence) -> PresenceStatus {
    match state {
        ChatPresence::Composing => PresenceStatus::Composing,
        ChatPresence::Paused => PresenceStatus::Available,
    }
}

/// Whether the message is something a person sent, as opposed to protocol
/// traffic (revokes, key distribution, reactions).
pub(super) fn is_user_content(inner: &Message) -> bool {
    if inner.protocol_message.is_some() || inner.reaction_message.is_some() {
        return false;
    }
    !message_text(inner).is_empty()
        || has_media(inner)
        || inner.sticker_message.is_some()
        || inner.contact_message.is_some()
        || inner.location_message.is_some()
}

/// One attachment per media part, without bytes.
pub(super) fn media_attachments(inner: &Message) -> Vec<Attachment> {
    let mut out = Vec::new();
    if let Some(ref img) = inner.image_message {
        out.push(Attachment {
            file_type: AttachmentType::Image,
            data: None,
            filename: None,
            mime_type: img.mimetype.clone(),
            gif_playback: false,
        });
    }
    if let Some(ref video) = inner.video_message {
        out.push(Attachment {
            file_type: AttachmentType::Video,
            data: None,
            filename: None,
            mime_type: video.mimetype.clone(),
            gif_playback: video.gif_playback.unwrap_or(false),
        });
    }
    if let Some(ref audio) = inner.audio_message {
        out.push(Attachment {
            file_type: AttachmentType::Audio,
            data: None,
            filename: Some("voice.ogg".to_string()),
            mime_type: audio.mimetype.clone(),
            gif_playback: false,
        });
    }
    if let Some(ref doc) = inner.document_message {
        out.push(Attachment {
            file_type: AttachmentType::Document,
            data: None,
            filename: doc.file_name.clone(),
            mime_type: doc.mimetype.clone(),
            gif_playback: false,
        });
    }
    out
}

fn downloadable(inner: &Message, kind: AttachmentType) -> Option<&dyn Downloadable> {
    match kind {
        AttachmentType::Image => inner.image_message.as_deref().map(|m| m as &dyn Downloadable),
        AttachmentType::Video => inner.video_message.as_deref().map(|m| m as &dyn Downloadable),
        AttachmentType::Audio => inner.audio_message.as_deref().map(|m| m as &dyn Downloadable),
        AttachmentType::Document => inner
            .document_message
            .as_deref()
            .map(|m| m as &dyn Downloadable),
        AttachmentType::Other => None,
    }
}

impl WhatsAppChannel {
    async fn forward(&self, event: ChannelEvent) {
        let tx = self.event_tx.lock().await.clone();
        match tx {
            Some(tx) => {
                if tx.send(event).await.is_err() {
                    info!("whatsapp channel receiver dropped");
                }
            }
            None => debug!("whatsapp event before start(), dropped"),
        }
    }

    /// Process an incoming WhatsApp message event.
    pub(super) async fn handle_message_event(
        &self,
        msg: Message,
        info: wacore::types::message::MessageInfo,
    ) {
        let is_group = info.source.is_group;
        let phone = info.source.sender.user.clone();

        debug!(
            "WA msg: is_group={is_group}, is_from_me={}, sender={phone}, chat={}",
            info.source.is_from_me, info.source.chat.user,
        );

        if self.sent_ids.lock().await.remove(&info.id) {
            debug!("skipping own echo: {}", info.id);
            return;
        }
        if should_ignore(
            info.source.is_from_me,
            is_group,
            self.config.ignore_groups,
            &phone,
            &self.config.allowed_users,
        ) {
            debug!("WA filtered: message from {phone} (group={is_group})");
            return;
        }

        let inner = unwrap_message(&msg);
        let text = message_text(inner);
        let quoted = quoted_text(inner);
        let attachments = self.download_attachments(inner).await;

        if !is_user_content(inner) {
            debug!("WA filtered: protocol or empty message from {phone}");
            return;
        }

        let chat_jid = info.source.chat.to_string();
        let sender_id = if is_group {
            info.source.sender.to_string()
        } else {
            chat_jid.clone()
        };
        let sender_name = if info.push_name.is_empty() {
            phone.clone()
        } else {
            info.push_name.clone()
        };

        let incoming = IncomingMessage {
            id: Uuid::new_v4(),
            channel: "whatsapp".to_string(),
            sender_id,
            sender_name: Some(sender_name),
            text,
            timestamp: chrono::Utc::now(),
            attachments,
            reply_target: Some(chat_jid),
            is_group,
            platform_id: Some(info.id.clone()),
            quoted_text: quoted,
        };

        self.forward(ChannelEvent::Message(incoming)).await;
    }

    pub(super) async fn handle_presence(&self, jid: String, status: PresenceStatus) {
        self.forward(ChannelEvent::Presence(PresenceUpdate {
            channel: "whatsapp".to_string(),
            jid,
            status,
        }))
        .await;
    }

    pub(super) async fn report_fatal(&self, reason: String) {
        self.forward(ChannelEvent::Fatal(reason)).await;
    }

    /// Download every media part of the message.
    ///
    /// A part that fails to download is kept without bytes so the gateway
    /// still knows what kind of message it was.
    async fn download_attachments(&self, inner: &Message) -> Vec<Attachment> {
        let mut parts = media_attachments(inner);
        if parts.is_empty() {
            return parts;
        }
        let Some(client) = self.client.lock().await.clone() else {
            warn!("whatsapp client not available for media download");
            return parts;
        };

        for part in &mut parts {
            let Some(source) = downloadable(inner, part.file_type) else {
                continue;
            };
            match client.download(source).await {
                Ok(bytes) => {
                    if part.file_type == AttachmentType::Audio {
                        let secs = inner
                            .audio_message
                            .as_ref()
                            .and_then(|a| a.seconds)
                            .unwrap_or(0);
                        info!("downloaded whatsapp voice note ({secs}s)");
                    }
                    part.data = Some(bytes);
                }
                Err(e) => warn!("whatsapp {:?} download failed: {e}", part.file_type),
            }
        }
        parts
    }
}

fn has_media(inner: &Message) -> bool {
    inner.image_message.is_some()
        || inner.video_message.is_some()
        || inner.audio_message.is_some()
        || inner.document_message.is_some()
}
