//! Channel trait implementation for WhatsApp.

use super::reconnect::DisconnectReason;
use super::send::{retry_send, sanitize_for_whatsapp, split_message, MAX_MESSAGE_LEN};
use super::WhatsAppChannel;
use async_trait::async_trait;
use sable_core::{
    error::SableError,
    message::{ChannelEvent, OutboundMedia, OutgoingMessage},
    traits::Channel,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use wacore_binary::jid::Jid;
use whatsapp_rust::client::Client;
use whatsapp_rust::download::MediaType;

fn parse_jid(jid_str: &str) -> Result<Jid, SableError> {
    jid_str
        .parse()
        .map_err(|e| SableError::Channel(format!("invalid whatsapp JID '{jid_str}': {e}")))
}

/// Guess an image MIME type from its magic bytes.
pub(super) fn image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() > 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

impl WhatsAppChannel {
    async fn connected_client(&self) -> Result<Arc<Client>, SableError> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or_else(|| SableError::Channel("whatsapp client not connected".into()))
    }

    async fn send_raw(&self, jid: &Jid, msg: waproto::whatsapp::Message) -> Result<(), SableError> {
        let client = self.connected_client().await?;
        let msg_id = retry_send(&client, jid, msg).await?;
        self.sent_ids.lock().await.insert(msg_id);
        Ok(())
    }

    /// Send a text message to a JID string (phone@s.whatsapp.net).
    async fn send_text(&self, jid_str: &str, text: &str) -> Result<(), SableError> {
        let jid = parse_jid(jid_str)?;
        let sanitized = sanitize_for_whatsapp(text);
        for chunk in split_message(&sanitized, MAX_MESSAGE_LEN) {
            let msg = waproto::whatsapp::Message {
                conversation: Some(chunk.to_string()),
                ..Default::default()
            };
            self.send_raw(&jid, msg).await?;
        }
        Ok(())
    }

    async fn send_media_impl(&self, jid_str: &str, media: OutboundMedia) -> Result<(), SableError> {
        let jid = parse_jid(jid_str)?;
        let client = self.connected_client().await?;
        let kind = media.kind();

        let msg = match media {
            OutboundMedia::Image { bytes, caption } => {
                let mime = image_mime(&bytes);
                let upload = client
                    .upload(bytes, MediaType::Image)
                    .await
                    .map_err(|e| SableError::Channel(format!("whatsapp {kind} upload failed: {e}")))?;
                waproto::whatsapp::Message {
                    image_message: Some(Box::new(waproto::whatsapp::message::ImageMessage {
                        mimetype: Some(mime.to_string()),
                        caption: (!caption.is_empty()).then(|| sanitize_for_whatsapp(&caption)),
                        url: Some(upload.url),
                        direct_path: Some(upload.direct_path),
                        media_key: Some(upload.media_key),
                        file_enc_sha256: Some(upload.file_enc_sha256),
                        file_sha256: Some(upload.file_sha256),
                        file_length: Some(upload.file_length),
                        ..Default::default()
                    })),
                    ..Default::default()
                }
            }
            OutboundMedia::Audio { bytes, mime } => {
                let upload = client
                    .upload(bytes, MediaType::Audio)
                    .await
                    .map_err(|e| SableError::Channel(format!("whatsapp {kind} upload failed: {e}")))?;
                waproto::whatsapp::Message {
                    audio_message: Some(Box::new(waproto::whatsapp::message::AudioMessage {
                        mimetype: Some(mime),
                        ptt: Some(false),
                        url: Some(upload.url),
                        direct_path: Some(upload.direct_path),
                        media_key: Some(upload.media_key),
                        file_enc_sha256: Some(upload.file_enc_sha256),
                        file_sha256: Some(upload.file_sha256),
                        file_length: Some(upload.file_length),
                        ..Default::default()
                    })),
                    ..Default::default()
                }
            }
            OutboundMedia::Video {
                bytes,
                caption,
                mime,
            } => {
                let upload = client
                    .upload(bytes, MediaType::Video)
                    .await
                    .map_err(|e| SableError::Channel(format!("whatsapp {kind} upload failed: {e}")))?;
                waproto::whatsapp::Message {
                    video_message: Some(Box::new(waproto::whatsapp::message::VideoMessage {
                        mimetype: Some(mime),
                        caption: (!caption.is_empty()).then(|| sanitize_for_whatsapp(&caption)),
                        url: Some(upload.url),
                        direct_path: Some(upload.direct_path),
                        media_key: Some(upload.media_key),
                        file_enc_sha256: Some(upload.file_enc_sha256),
                        file_sha256: Some(upload.file_sha256),
                        file_length: Some(upload.file_length),
                        ..Default::default()
                    })),
                    ..Default::default()
                }
            }
        };

        let msg_id = retry_send(&client, &jid, msg).await?;
        self.sent_ids.lock().await.insert(msg_id);
        info!("sent whatsapp {kind} to {jid_str}");
        Ok(())
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn start(&self) -> Result<mpsc::Receiver<ChannelEvent>, SableError> {
        let (tx, rx) = mpsc::channel(64);
        *self.event_tx.lock().await = Some(tx);

        let (reasons_tx, reasons_rx) = mpsc::unbounded_channel();
        if let Err(e) = self.build_and_run_bot(reasons_tx.clone()).await {
            warn!("WhatsApp bot failed to start: {e}");
            let _ = reasons_tx.send(DisconnectReason::BuildFailed);
        }
        tokio::spawn(self.clone().supervise(reasons_tx, reasons_rx));

        info!("WhatsApp channel started");
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), SableError> {
        let target = message
            .reply_target
            .as_deref()
            .ok_or_else(|| SableError::Channel("no reply_target on outgoing message".into()))?;

        self.send_text(target, &message.text).await
    }

    async fn send_media(&self, target: &str, media: OutboundMedia) -> Result<(), SableError> {
        self.send_media_impl(target, media).await
    }

    async fn send_reaction(
        &self,
        target: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), SableError> {
        let jid = parse_jid(target)?;
        let reaction = waproto::whatsapp::message::ReactionMessage {
            key: Some(waproto::whatsapp::MessageKey {
                remote_jid: Some(target.to_string()),
                from_me: Some(false),
                id: Some(message_id.to_string()),
                participant: None,
                ..Default::default()
            }),
            text: Some(emoji.to_string()),
            sender_timestamp_ms: Some(chrono::Utc::now().timestamp_millis()),
            ..Default::default()
        };
        let msg = waproto::whatsapp::Message {
            reaction_message: Some(reaction.into()),
            ..Default::default()
        };
        self.send_raw(&jid, msg).await
    }

    async fn send_typing(&self, target: &str) -> Result<(), SableError> {
        let client = self.client.lock().await.clone();
        if let Some(client) = client {
            let jid = parse_jid(target)?;
            let _ = client.chatstate().send_composing(&jid).await;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), SableError> {
        self.abort_bot().await;
        info!("WhatsApp channel stopped");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
