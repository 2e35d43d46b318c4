//! # sable-providers
//!
//! Hosted model backends: OpenAI-compatible chat completion (Groq by default)
//! and Whisper-style speech-to-text.

pub mod openai;
pub mod whisper;

pub use openai::OpenAiProvider;
pub use whisper::WhisperTranscriber;
