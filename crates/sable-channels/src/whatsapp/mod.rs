//! WhatsApp channel, pure Rust implementation via `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning a QR code, like WhatsApp Web. The latest code
//! is printed to the terminal and written to `{data_dir}/login-qr.png`.
//! Session is persisted to `{data_dir}/whatsapp_session/whatsapp.db`.

mod bot;
mod channel;
mod events;
mod qr;
mod reconnect;
mod send;

#[cfg(test)]
mod tests;

pub use qr::{generate_qr_image, generate_qr_terminal};
pub use reconnect::{DisconnectReason, ReconnectDecision, ReconnectPolicy};
pub use send::{sanitize_for_whatsapp, split_message};

use sable_core::config::WhatsAppConfig;
use sable_core::message::ChannelEvent;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// WhatsApp channel using the WhatsApp Web protocol.
///
/// Cheap to clone: every piece of state lives behind an `Arc`, so the
/// reconnect supervisor and the event handler share it with the gateway.
#[derive(Clone)]
pub struct WhatsAppChannel {
    pub(super) config: WhatsAppConfig,
    pub(super) data_dir: PathBuf,
    /// Client handle for sending messages, set once connected.
    pub(super) client: Arc<Mutex<Option<Arc<whatsapp_rust::client::Client>>>>,
    /// Message IDs we sent, used to ignore our own echo.
    pub(super) sent_ids: Arc<Mutex<HashSet<String>>>,
    /// Last QR code data, cleared on connect.
    pub(super) last_qr: Arc<Mutex<Option<String>>>,
    /// Gateway-facing event sender, stored so rebuilt bots reuse it.
    pub(super) event_tx: Arc<Mutex<Option<mpsc::Sender<ChannelEvent>>>>,
    /// Background task driving the current bot.
    pub(super) bot_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    pub(super) policy: Arc<Mutex<ReconnectPolicy>>,
}

impl WhatsAppChannel {
    /// Create a new WhatsApp channel from config.
    pub fn new(config: WhatsAppConfig, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            data_dir: data_dir.into(),
            client: Arc::new(Mutex::new(None)),
            sent_ids: Arc::new(Mutex::new(HashSet::new())),
            last_qr: Arc::new(Mutex::new(None)),
            event_tx: Arc::new(Mutex::new(None)),
            bot_handle: Arc::new(Mutex::new(None)),
            policy: Arc::new(Mutex::new(ReconnectPolicy::new())),
        }
    }

    /// Check if the WhatsApp client is currently connected.
    pub async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    /// Latest QR payload waiting to be scanned, if any. Cleared on connect.
    pub async fn latest_qr(&self) -> Option<String> {
        self.last_qr.lock().await.clone()
    }

    /// Where the login QR image is written.
    pub fn qr_image_path(&self) -> PathBuf {
        self.data_dir.join("login-qr.png")
    }

    /// Drop the pairing QR once it can no longer be scanned.
    pub(super) async fn clear_qr_image(&self) {
        match tokio::fs::remove_file(self.qr_image_path()).await {
            Ok(()) => info!("removed stale login QR"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove login QR: {e}"),
        }
    }

    /// Get the session database path, creating its directory.
    pub(super) fn session_db_path(&self) -> String {
        let session_dir = self.data_dir.join("whatsapp_session");
        let _ = std::fs::create_dir_all(&session_dir);
        session_dir.join("whatsapp.db").to_string_lossy().to_string()
    }
}
