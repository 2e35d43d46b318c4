//! OpenAI-compatible chat-completion provider.
//!
//! Defaults to Groq's endpoint. Images in the context are sent inline as
//! base64 `data:` URLs to the configured vision model.

use async_trait::async_trait;
use sable_core::{
    config::ProviderConfig,
    context::{ApiMessage, Context, ImageInput},
    error::SableError,
    message::{MessageMetadata, OutgoingMessage},
    traits::Provider,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    vision_model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiProvider {
    /// Create from config values.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Build OpenAI-format messages from context (system as a message role).
///
/// When `image` is set, the last user message becomes a text + image_url part list.
pub(crate) fn build_openai_messages(
    system: &str,
    api_messages: &[ApiMessage],
    image: Option<&ImageInput>,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(api_messages.len() + 1);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: MessageContent::Text(system.to_string()),
        });
    }
    let last = api_messages.len().saturating_sub(1);
    for (i, m) in api_messages.iter().enumerate() {
        let content = match image {
            Some(img) if i == last => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: m.content.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: img.data_url(),
                    },
                },
            ]),
            _ => MessageContent::Text(m.content.clone()),
        };
        messages.push(ChatMessage {
            role: m.role.clone(),
            content,
        });
    }
    messages
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub(crate) enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    fn into_text(self) -> String {
        match self {
            Self::Text(t) => t,
            Self::Parts(parts) => parts
                .into_iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct ImageUrl {
    pub url: String,
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
    pub model: Option<String>,
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatUsage {
    pub total_tokens: Option<u64>,
}

/// Pull the first choice's text out of a response, trimmed.
pub(crate) fn response_text(parsed: ChatCompletionResponse) -> Option<String> {
    parsed
        .choices?
        .into_iter()
        .next()?
        .message
        .map(|m| m.content.into_text().trim().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, SableError> {
        if self.api_key.is_empty() {
            return Err(SableError::Provider("no API key configured".into()));
        }

        let (system, api_messages) = context.to_api_messages();
        let effective_model = match context.image {
            Some(_) => self.vision_model.as_str(),
            None => self.model.as_str(),
        };
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model: effective_model.to_string(),
            messages: build_openai_messages(&system, &api_messages, context.image.as_ref()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let url = self.endpoint("chat/completions");
        debug!("chat: POST {url} model={effective_model}");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SableError::Provider(format!("chat request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!("chat API returned {status}: {text}");
            return Err(SableError::Provider(format!(
                "chat API returned {}",
                status.as_u16()
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| SableError::Provider(format!("failed to parse chat response: {e}")))?;

        let tokens = parsed.usage.as_ref().and_then(|u| u.total_tokens);
        let model = parsed.model.clone();
        let text = response_text(parsed)
            .unwrap_or_else(|| "I couldn't process your request right now.".to_string());

        Ok(OutgoingMessage {
            text,
            metadata: MessageMetadata {
                provider_used: self.name().to_string(),
                tokens_used: tokens,
                processing_time_ms: start.elapsed().as_millis() as u64,
                model,
            },
            reply_target: None,
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("chat provider: no API key configured");
            return false;
        }
        match self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("chat provider not available: {e}");
                false
            }
        }
    }
}
