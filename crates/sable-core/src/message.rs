use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "whatsapp").
    pub channel: String,
    /// Platform-specific user ID (the sender JID).
    pub sender_id: String,
    /// Human-readable sender name (push name).
    pub sender_name: Option<String>,
    /// Message text or media caption.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    /// Platform-specific target for routing the response (the chat JID).
    #[serde(default)]
    pub reply_target: Option<String>,
    /// Whether this message comes from a group chat.
    #[serde(default)]
    pub is_group: bool,
    /// Network message ID, needed to react to this message.
    #[serde(default)]
    pub platform_id: Option<String>,
    /// Text of the message this one replies to, or a placeholder like `[An Image]`.
    #[serde(default)]
    pub quoted_text: Option<String>,
}

impl IncomingMessage {
    /// First attachment of the given type, if any.
    pub fn attachment(&self, kind: AttachmentType) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.file_type == kind)
    }
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub metadata: MessageMetadata,
    /// Platform-specific target for routing (the chat JID).
    #[serde(default)]
    pub reply_target: Option<String>,
}

impl OutgoingMessage {
    /// Plain text addressed to a target.
    pub fn text(target: &str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: MessageMetadata::default(),
            reply_target: Some(target.to_string()),
        }
    }
}

/// Metadata about how a message was generated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    /// Which provider produced this response.
    pub provider_used: String,
    /// Token count (if available from the provider).
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Model identifier (if applicable).
    pub model: Option<String>,
}

/// A file attachment on a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub file_type: AttachmentType,
    pub data: Option<Vec<u8>>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    /// Video sent with the GIF playback flag.
    #[serde(default)]
    pub gif_playback: bool,
}

/// Supported attachment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentType {
    Image,
    Document,
    Audio,
    Video,
    Other,
}

impl AttachmentType {
    /// File extension used when saving a received attachment.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Video => "mp4",
            Self::Audio => "mp3",
            Self::Document | Self::Other => "bin",
        }
    }
}

/// Media the bot sends out.
#[derive(Debug, Clone)]
pub enum OutboundMedia {
    Image {
        bytes: Vec<u8>,
        caption: String,
    },
    Audio {
        bytes: Vec<u8>,
        mime: String,
    },
    Video {
        bytes: Vec<u8>,
        caption: String,
        mime: String,
    },
}

impl OutboundMedia {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Audio { .. } => "audio",
            Self::Video { .. } => "video",
        }
    }
}

/// Last known presence of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceStatus {
    Available,
    Composing,
    Offline,
}

impl PresenceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "online",
            Self::Composing => "typing",
            Self::Offline => "offline",
        }
    }
}

/// A presence change reported by the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub channel: String,
    pub jid: String,
    pub status: PresenceStatus,
}

/// Everything a channel forwards to the gateway.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Message(IncomingMessage),
    Presence(PresenceUpdate),
    /// The channel cannot continue (e.g. repeated session conflicts).
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with(attachments: Vec<Attachment>) -> IncomingMessage {
        IncomingMessage {
            id: Uuid::new_v4(),
            channel: "whatsapp".into(),
            sender_id: "923001234567@s.whatsapp.net".into(),
            sender_name: None,
            text: String::new(),
            timestamp: Utc::now(),
            attachments,
            reply_target: None,
            is_group: false,
            platform_id: None,
            quoted_text: None,
        }
    }

    #[test]
    fn test_attachment_lookup_by_type() {
        let msg = message_with(vec![Attachment {
            file_type: AttachmentType::Audio,
            data: Some(vec![1, 2, 3]),
            filename: None,
            mime_type: Some("audio/ogg".into()),
            gif_playback: false,
        }]);
        assert!(msg.attachment(AttachmentType::Audio).is_some());
        assert!(msg.attachment(AttachmentType::Image).is_none());
    }

    #[test]
    fn test_attachment_extensions() {
        assert_eq!(AttachmentType::Image.extension(), "jpg");
        assert_eq!(AttachmentType::Video.extension(), "mp4");
        assert_eq!(AttachmentType::Audio.extension(), "mp3");
        assert_eq!(AttachmentType::Document.extension(), "bin");
    }

    #[test]
    fn test_presence_labels() {
        assert_eq!(PresenceStatus::Available.label(), "online");
        assert_eq!(PresenceStatus::Composing.label(), "typing");
        assert_eq!(PresenceStatus::Offline.label(), "offline");
    }

    #[test]
    fn test_outgoing_text_sets_target() {
        let out = OutgoingMessage::text("123@s.whatsapp.net", "hi");
        assert_eq!(out.reply_target.as_deref(), Some("123@s.whatsapp.net"));
        assert_eq!(out.text, "hi");
    }
}
