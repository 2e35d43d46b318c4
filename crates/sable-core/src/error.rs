use thiserror::Error;

/// Top-level error type for Sable.
#[derive(Debug, Error)]
pub enum SableError {
    /// Error from the chat-completion or speech-to-text API.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from the messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Flat-file storage error (transcripts, profiles, leads).
    #[error("memory error: {0}")]
    Memory(String),

    /// File sandbox error.
    #[error("sandbox error: {0}")]
    Sandbox(String),

    /// Search, scrape, or download chain error.
    #[error("media error: {0}")]
    Media(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
