//! Gateway: the main event loop connecting the channel, commands, and the model.
//!
//! Includes: per-sender serialization, presence tracking, audit logging,
//! the QR HTTP server, and graceful shutdown.

mod directives;
mod pipeline;

#[cfg(test)]
mod tests;

use crate::ai::AiService;
use sable_core::{
    config::{ApiConfig, Config, PersonaConfig},
    message::{ChannelEvent, IncomingMessage, OutboundMedia, OutgoingMessage},
    traits::Channel,
};
use sable_media::MediaClient;
use sable_memory::{
    audit::{AuditEntry, AuditLogger, Direction},
    LeadStore, ProfileStore, StatsTracker,
};
use sable_sandbox::FileSandbox;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{error, info, warn};

/// Delay between the shutdown notice and the process stopping.
const SHUTDOWN_DELAY: Duration = Duration::from_secs(1);

/// The central gateway that routes messages between the channel and the model.
pub struct Gateway {
    pub(super) ai: AiService,
    pub(super) channels: HashMap<String, Arc<dyn Channel>>,
    pub(super) media: MediaClient,
    pub(super) sandbox: FileSandbox,
    pub(super) profiles: ProfileStore,
    pub(super) leads: LeadStore,
    pub(super) stats: StatsTracker,
    pub(super) audit: AuditLogger,
    pub(super) persona: PersonaConfig,
    pub(super) api_config: ApiConfig,
    pub(super) data_dir: PathBuf,
    pub(super) uptime: Instant,
    /// Tracks senders with a message in flight. New messages are buffered here.
    pub(super) active_senders: Mutex<HashMap<String, Vec<IncomingMessage>>>,
    /// Signalled by the owner shutdown command.
    pub(super) shutdown: Notify,
}

impl Gateway {
    /// Create a new gateway. Stores live under `data_dir`.
    pub fn new(
        config: &Config,
        data_dir: PathBuf,
        ai: AiService,
        channels: HashMap<String, Arc<dyn Channel>>,
        media: MediaClient,
    ) -> Self {
        Self {
            ai,
            channels,
            media,
            sandbox: FileSandbox::new(data_dir.join("sandbox")),
            profiles: ProfileStore::new(data_dir.join("profiles")),
            leads: LeadStore::new(data_dir.join("leads.json")),
            stats: StatsTracker::new(),
            audit: AuditLogger::new(data_dir.join("logs").join("messages.log")),
            persona: config.persona.clone(),
            api_config: config.api.clone(),
            data_dir,
            uptime: Instant::now(),
            active_senders: Mutex::new(HashMap::new()),
            shutdown: Notify::new(),
        }
    }

    /// Run the main event loop until Ctrl-C, the shutdown command, or a fatal channel error.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "{} gateway running | provider: {} | channels: {}",
            self.persona.name,
            self.ai.provider_name(),
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
        );

        let (tx, mut rx) = mpsc::channel::<ChannelEvent>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(event) = channel_rx.recv().await {
                    if tx.send(event).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        // Spawn QR HTTP server.
        let api_handle = if self.api_config.enabled {
            let api_cfg = self.api_config.clone();
            let api_channels = self.channels.clone();
            let api_uptime = self.uptime;
            let api_data_dir = self.data_dir.clone();
            Some(tokio::spawn(async move {
                crate::api::serve(api_cfg, api_channels, api_uptime, api_data_dir).await;
            }))
        } else {
            None
        };

        // Main event loop with graceful shutdown.
        let mut fatal = None;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(ChannelEvent::Message(incoming)) => {
                        let gw = self.clone();
                        tokio::spawn(async move {
                            gw.dispatch_message(incoming).await;
                        });
                    }
                    Some(ChannelEvent::Presence(update)) => {
                        self.stats.set_presence(&update.jid, update.status).await;
                    }
                    Some(ChannelEvent::Fatal(reason)) => {
                        error!("channel failure: {reason}");
                        fatal = Some(reason);
                        break;
                    }
                    None => {
                        warn!("all channels closed");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = self.shutdown.notified() => {
                    info!("Shutdown requested by owner");
                    break;
                }
            }
        }

        self.stop(&api_handle).await;
        match fatal {
            Some(reason) => Err(anyhow::anyhow!(reason)),
            None => Ok(()),
        }
    }

    /// Dispatch a message: buffer if the sender is busy, otherwise process.
    pub(super) async fn dispatch_message(self: Arc<Self>, incoming: IncomingMessage) {
        let sender_key = format!("{}:{}", incoming.channel, incoming.sender_id);

        {
            let mut active = self.active_senders.lock().await;
            if let Some(buffer) = active.get_mut(&sender_key) {
                buffer.push(incoming);
                info!("buffered message from {sender_key} (reply in progress)");
                return;
            }
            // Mark sender as active (empty buffer).
            active.insert(sender_key.clone(), Vec::new());
        }

        self.handle_message(incoming).await;

        // Drain any buffered messages for this sender, in arrival order.
        loop {
            let next = {
                let mut active = self.active_senders.lock().await;
                match active.get_mut(&sender_key) {
                    Some(buf) if !buf.is_empty() => Some(buf.remove(0)),
                    _ => {
                        active.remove(&sender_key);
                        None
                    }
                }
            };

            match next {
                Some(buffered) => {
                    info!("processing buffered message from {sender_key}");
                    self.handle_message(buffered).await;
                }
                None => break,
            }
        }
    }

    /// Stop the process shortly after the shutdown notice went out.
    pub(super) fn schedule_shutdown(self: &Arc<Self>) {
        let gw = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SHUTDOWN_DELAY).await;
            gw.shutdown.notify_one();
        });
    }

    /// Graceful shutdown: stop the HTTP server and all channels.
    async fn stop(&self, api_handle: &Option<tokio::task::JoinHandle<()>>) {
        info!("Shutting down...");

        if let Some(h) = api_handle {
            h.abort();
        }

        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }

        info!("Shutdown complete.");
    }

    fn channel_for(&self, incoming: &IncomingMessage) -> Option<&Arc<dyn Channel>> {
        let channel = self.channels.get(&incoming.channel);
        if channel.is_none() {
            error!("no channel named {} for reply", incoming.channel);
        }
        channel
    }

    /// Chat JID replies go to.
    pub(super) fn reply_target(incoming: &IncomingMessage) -> &str {
        incoming
            .reply_target
            .as_deref()
            .unwrap_or(&incoming.sender_id)
    }

    /// Send text to an arbitrary JID on the message's channel, with audit.
    pub(super) async fn send_text_to(&self, incoming: &IncomingMessage, target: &str, text: &str) {
        let Some(channel) = self.channel_for(incoming) else {
            return;
        };
        if let Err(e) = channel.send(OutgoingMessage::text(target, text)).await {
            error!("failed to send message to {target}: {e}");
            return;
        }
        self.audit_out(target, text).await;
    }

    /// Send a plain text message back to the sender.
    pub(super) async fn send_text(&self, incoming: &IncomingMessage, text: &str) {
        self.send_text_to(incoming, Self::reply_target(incoming), text)
            .await;
    }

    /// Upload media back to the sender. Returns whether it went out.
    pub(super) async fn send_media(&self, incoming: &IncomingMessage, media: OutboundMedia) -> bool {
        let Some(channel) = self.channel_for(incoming) else {
            return false;
        };
        let target = Self::reply_target(incoming);
        let kind = media.kind();
        let caption = match &media {
            OutboundMedia::Image { caption, .. } | OutboundMedia::Video { caption, .. } => {
                caption.clone()
            }
            OutboundMedia::Audio { .. } => String::new(),
        };
        match channel.send_media(target, media).await {
            Ok(()) => {
                self.audit_out(target, &format!("[{kind}] {caption}")).await;
                true
            }
            Err(e) => {
                error!("failed to send {kind} to {target}: {e}");
                false
            }
        }
    }

    pub(super) async fn audit_in(&self, sender: &str, text: &str) {
        self.audit_entry(Direction::In, sender, text).await;
    }

    async fn audit_out(&self, target: &str, text: &str) {
        self.audit_entry(Direction::Out, target, text).await;
    }

    async fn audit_entry(&self, direction: Direction, sender: &str, text: &str) {
        if let Err(e) = self
            .audit
            .log(&AuditEntry {
                direction,
                sender,
                text,
            })
            .await
        {
            warn!("audit log write failed: {e}");
        }
    }
}
