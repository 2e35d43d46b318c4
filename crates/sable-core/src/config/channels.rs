use serde::{Deserialize, Serialize};

use super::defaults::default_true;

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

/// WhatsApp channel config.
///
/// Session data is stored at `{data_dir}/whatsapp_session/`.
/// Pairing is done by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allowed phone numbers (e.g. `["923001234567"]`). Empty = allow all.
    #[serde(default)]
    pub allowed_users: Vec<String>,
    /// Drop messages from group chats.
    #[serde(default = "default_true")]
    pub ignore_groups: bool,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_users: Vec::new(),
            ignore_groups: true,
        }
    }
}
