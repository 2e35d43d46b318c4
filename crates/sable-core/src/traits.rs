use crate::{
    context::Context,
    error::SableError,
    message::{ChannelEvent, OutboundMedia, OutgoingMessage},
};
use async_trait::async_trait;

/// Chat-completion backend.
///
/// Every hosted model endpoint implements this trait so the gateway can
/// talk to it without knowing the wire format.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether this provider requires an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Send a conversation context to the provider and get a response.
    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, SableError>;

    /// Check if the provider is available and ready.
    async fn is_available(&self) -> bool;
}

/// Speech-to-text backend for voice notes.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String, SableError>;
}

/// Messaging channel.
///
/// The channel owns the network connection and forwards everything it
/// receives to the gateway as [`ChannelEvent`]s.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening. Returns a receiver that yields channel events.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<ChannelEvent>, SableError>;

    /// Send a text reply through this channel.
    async fn send(&self, message: OutgoingMessage) -> Result<(), SableError>;

    /// Upload and send an image, audio clip, or video.
    async fn send_media(&self, _target: &str, _media: OutboundMedia) -> Result<(), SableError> {
        Ok(())
    }

    /// React to a received message with an emoji.
    async fn send_reaction(
        &self,
        _target: &str,
        _message_id: &str,
        _emoji: &str,
    ) -> Result<(), SableError> {
        Ok(())
    }

    /// Send a typing indicator to show the bot is processing.
    async fn send_typing(&self, _target: &str) -> Result<(), SableError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), SableError>;

    /// Downcast support for channel-specific features (e.g. connection state).
    fn as_any(&self) -> &dyn std::any::Any;
}
