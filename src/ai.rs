//! Persona chat on top of a [`Provider`], with per-sender transcripts.

use sable_core::{
    config::{PersonaConfig, Prompts},
    context::{Context, ContextEntry, ImageInput},
    traits::{Provider, Transcriber},
};
use sable_memory::ConversationStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Returned when no API key is configured.
pub const MISSING_KEY_REPLY: &str = "⚠️ The AI API key is missing. Set GROQ_API_KEY and restart.";

/// Returned when the chat endpoint fails.
pub const PROVIDER_ERROR_REPLY: &str =
    "❌ Sorry yaar, my brain is offline for a moment. Try again in a bit.";

/// File name sent with voice notes to the speech-to-text endpoint.
const VOICE_FILE_NAME: &str = "voice.ogg";

pub struct AiService {
    provider: Arc<dyn Provider>,
    transcriber: Arc<dyn Transcriber>,
    conversations: ConversationStore,
    prompts: Prompts,
    persona: PersonaConfig,
    has_api_key: bool,
}

impl AiService {
    pub fn new(
        provider: Arc<dyn Provider>,
        transcriber: Arc<dyn Transcriber>,
        conversations: ConversationStore,
        prompts: Prompts,
        persona: PersonaConfig,
        has_api_key: bool,
    ) -> Self {
        Self {
            provider,
            transcriber,
            conversations,
            prompts,
            persona,
            has_api_key,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One conversational turn for `sender`.
    ///
    /// The user turn is always recorded; the assistant turn only when the
    /// provider answered. Failures come back as a friendly reply string.
    pub async fn reply(
        &self,
        sender: &str,
        user_name: &str,
        prompt: &str,
        image: Option<ImageInput>,
    ) -> String {
        if !self.has_api_key {
            return MISSING_KEY_REPLY.to_string();
        }

        if let Err(e) = self
            .conversations
            .push(sender, ContextEntry::user(prompt))
            .await
        {
            warn!("failed to save user turn for {sender}: {e}");
        }

        let mut history = self.conversations.history(sender).await;
        // The newest entry is the prompt itself.
        history.pop();

        let context = Context {
            system_prompt: self.prompts.system_for(
                &self.persona.name,
                &self.persona.owner_name,
                user_name,
            ),
            history,
            current_message: prompt.to_string(),
            image,
        };

        match self.provider.complete(&context).await {
            Ok(response) => {
                info!(
                    "reply for {sender} via {} ({}ms)",
                    response.metadata.provider_used, response.metadata.processing_time_ms
                );
                if let Err(e) = self
                    .conversations
                    .push(sender, ContextEntry::assistant(&response.text))
                    .await
                {
                    warn!("failed to save assistant turn for {sender}: {e}");
                }
                response.text
            }
            Err(e) => {
                warn!("provider error for {sender}: {e}");
                PROVIDER_ERROR_REPLY.to_string()
            }
        }
    }

    /// Summarize research findings. One-shot: nothing is recorded in any transcript.
    pub async fn synthesize(&self, query: &str, findings: &str) -> String {
        if !self.has_api_key {
            return MISSING_KEY_REPLY.to_string();
        }
        let mut context = Context::new(query);
        context.system_prompt = self
            .prompts
            .research_for(&self.persona.name, query, findings);
        match self.provider.complete(&context).await {
            Ok(response) => response.text,
            Err(e) => {
                warn!("research synthesis failed for '{query}': {e}");
                format!("Here's what I found on *{query}*:\n\n{findings}")
            }
        }
    }

    /// Speech-to-text for a voice note. `None` on any failure.
    pub async fn transcribe(&self, audio: &[u8]) -> Option<String> {
        match self.transcriber.transcribe(audio, VOICE_FILE_NAME).await {
            Ok(text) if !text.trim().is_empty() => {
                info!("transcribed voice note ({} chars)", text.len());
                Some(text.trim().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                warn!("voice transcription failed: {e}");
                None
            }
        }
    }

    /// Forget the sender's transcript.
    pub async fn reset(&self, sender: &str) {
        if let Err(e) = self.conversations.reset(sender).await {
            warn!("failed to reset memory for {sender}: {e}");
        }
    }

    #[cfg(test)]
    pub(crate) async fn history(&self, sender: &str) -> Vec<ContextEntry> {
        self.conversations.history(sender).await
    }
}
