mod channels;
mod defaults;
mod prompts;


pub use channels::*;
pub use prompts::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::SableError;
use defaults::*;

/// Top-level Sable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sable: SableConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SableConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for SableConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl SableConfig {
    /// Data directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.data_dir))
    }
}

/// Who the bot pretends to be and who owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_owner_name")]
    pub owner_name: String,
    /// Owner phone number or JID. Empty = no owner-only commands.
    #[serde(default)]
    pub owner_jid: String,
    /// Owner photos, relative to `data_dir` unless absolute.
    #[serde(default)]
    pub owner_photos: Vec<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            owner_name: default_owner_name(),
            owner_jid: String::new(),
            owner_photos: Vec::new(),
        }
    }
}

impl PersonaConfig {
    /// Whether `jid` belongs to the configured owner.
    pub fn is_owner(&self, jid: &str) -> bool {
        let owner = jid_user(&self.owner_jid);
        !owner.is_empty() && owner == jid_user(jid)
    }
}

/// Phone part of a JID: `92300111:3@s.whatsapp.net` → `92300111`.
pub fn jid_user(jid: &str) -> &str {
    let user = jid.split('@').next().unwrap_or(jid);
    user.split(':').next().unwrap_or(user).trim()
}

/// OpenAI-compatible chat and speech-to-text endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            vision_model: default_vision_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            transcription_model: default_transcription_model(),
        }
    }
}

/// Conversation memory config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum transcript entries kept per sender.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

/// HTTP server that exposes the login QR code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

/// Outbound scraping and download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup (`GROQ_API_KEY`, `OWNER_JID`, `PORT`, `SABLE_DATA_DIR`).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GROQ_API_KEY") {
            self.provider.api_key = key;
        }
        if let Some(owner) = get("OWNER_JID") {
            self.persona.owner_jid = owner;
        }
        if let Some(port) = get("PORT") {
            match port.trim().parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!("ignoring invalid PORT value '{port}'"),
            }
        }
        if let Some(dir) = get("SABLE_DATA_DIR") {
            self.sable.data_dir = dir;
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Create the data directory layout (`logs/`, `history/`, `profiles/`, `sandbox/`, `media/`, `prompts/`).
pub fn ensure_layout(data_dir: &Path) -> Result<(), SableError> {
    for sub in ["logs", "history", "profiles", "sandbox", "media", "prompts"] {
        std::fs::create_dir_all(data_dir.join(sub))?;
    }
    Ok(())
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, SableError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| SableError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| SableError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
