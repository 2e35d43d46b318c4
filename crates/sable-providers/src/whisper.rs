//! Voice-note transcription via an OpenAI-compatible `/audio/transcriptions` endpoint.

use async_trait::async_trait;
use sable_core::{config::ProviderConfig, error::SableError, traits::Transcriber};
use serde::Deserialize;

/// Whisper API response.
#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Speech-to-text client. Shares the chat provider's base URL and key.
pub struct WhisperTranscriber {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl WhisperTranscriber {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.transcription_model.clone(),
        }
    }
}

/// MIME type for an audio file name, defaulting to Ogg/Opus voice notes.
pub(crate) fn audio_mime(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "mp3" => "audio/mpeg",
        Some(ext) if ext == "m4a" || ext == "mp4" => "audio/mp4",
        Some(ext) if ext == "wav" => "audio/wav",
        _ => "audio/ogg",
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String, SableError> {
        if self.api_key.is_empty() {
            return Err(SableError::Provider("no API key for transcription".into()));
        }

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(filename.to_string())
            .mime_str(audio_mime(filename))
            .map_err(|e| SableError::Provider(format!("whisper mime error: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let url = format!(
            "{}/audio/transcriptions",
            self.base_url.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SableError::Provider(format!("whisper request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SableError::Provider(format!(
                "whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = resp
            .json()
            .await
            .map_err(|e| SableError::Provider(format!("whisper response parse failed: {e}")))?;

        Ok(result.text.trim().to_string())
    }
}
