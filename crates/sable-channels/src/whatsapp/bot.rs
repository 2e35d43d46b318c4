//! Bot lifecycle: building, running, and reconnecting the WhatsApp bot.

use super::events::{chat_presence_status, presence_status};
use super::qr::publish_qr;
use super::reconnect::{DisconnectReason, ReconnectDecision};
use super::WhatsAppChannel;
use sable_core::error::SableError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

impl WhatsAppChannel {
    /// Build a WhatsApp bot with the event handler and run it in the background.
    ///
    /// Connection-level events are reported on `reasons` for the supervisor.
    pub(super) async fn build_and_run_bot(
        &self,
        reasons: mpsc::UnboundedSender<DisconnectReason>,
    ) -> Result<(), SableError> {
        let db_path = self.session_db_path();
        info!("WhatsApp bot building (session: {db_path})...");

        let backend = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .map_err(|e| SableError::Channel(format!("whatsapp store init failed: {e}")))?,
        );

        let channel = self.clone();
        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_os_info(Some("Sable".to_string()), None)
            .on_event(move |event, client| {
                let channel = channel.clone();
                let reasons = reasons.clone();
                async move {
                    match event {
                        Event::PairingQrCode { code, .. } => {
                            info!("WhatsApp QR code generated (scan to pair)");
                            let png_path = channel.qr_image_path();
                            match publish_qr(&code, &png_path) {
                                Ok(()) => info!("QR saved to {}", png_path.display()),
                                Err(e) => warn!("failed to render QR: {e}"),
                            }
                            *channel.last_qr.lock().await = Some(code);
                        }
                        Event::PairSuccess(_) => {
                            info!("WhatsApp pairing successful!");
                        }
                        Event::Connected(_) => {
                            info!("WhatsApp connected");
                            *channel.client.lock().await = Some(client);
                            *channel.last_qr.lock().await = None;
                            channel.clear_qr_image().await;
                            channel.policy.lock().await.on_connected();
                        }
                        Event::Disconnected(_) => {
                            warn!("WhatsApp disconnected");
                            *channel.client.lock().await = None;
                            let _ = reasons.send(DisconnectReason::Other);
                        }
                        Event::StreamReplaced(_) => {
                            warn!("WhatsApp session replaced by another client");
                            *channel.client.lock().await = None;
                            let _ = reasons.send(DisconnectReason::Conflict);
                        }
                        Event::LoggedOut(_) => {
                            warn!("WhatsApp logged out, session invalidated");
                            *channel.client.lock().await = None;
                            let _ = reasons.send(DisconnectReason::LoggedOut);
                        }
                        Event::Message(msg, info) => {
                            channel.handle_message_event(*msg, info).await;
                        }
                        Event::Presence(update) => {
                            channel
                                .handle_presence(
                                    update.from.to_string(),
                                    presence_status(update.unavailable),
                                )
                                .await;
                        }
                        Event::ChatPresence(update) => {
                            channel
                                .handle_presence(
                                    update.source.sender.to_string(),
                                    chat_presence_status(update.state),
                                )
                                .await;
                        }
                        _ => {}
                    }
                }
            })
            .build()
            .await
            .map_err(|e| SableError::Channel(format!("whatsapp bot build failed: {e}")))?;

        let handle = bot
            .run()
            .await
            .map_err(|e| SableError::Channel(format!("whatsapp bot run failed: {e}")))?;

        if let Some(old) = self.bot_handle.lock().await.replace(handle) {
            old.abort();
        }

        info!("WhatsApp bot started");
        Ok(())
    }

    /// Apply the reconnect policy to every reported disconnect.
    ///
    /// Runs until the session is logged out or the conflict limit is hit.
    pub(super) async fn supervise(
        self,
        reasons_tx: mpsc::UnboundedSender<DisconnectReason>,
        mut reasons: mpsc::UnboundedReceiver<DisconnectReason>,
    ) {
        while let Some(reason) = reasons.recv().await {
            let decision = self.policy.lock().await.decide(reason);
            match decision {
                ReconnectDecision::Stop => {
                    error!("WhatsApp logged out. Delete the session and scan a new QR code.");
                    self.abort_bot().await;
                    return;
                }
                ReconnectDecision::Abort => {
                    let conflicts = self.policy.lock().await.conflicts();
                    error!("WhatsApp session conflict {conflicts} times, another instance is running");
                    self.abort_bot().await;
                    self.report_fatal(format!(
                        "whatsapp session replaced {conflicts} times; stop the other instance"
                    ))
                    .await;
                    return;
                }
                ReconnectDecision::Reconnect(delay) => {
                    info!("WhatsApp reconnecting in {}s ({reason:?})", delay.as_secs());
                    tokio::time::sleep(delay).await;
                    if self.is_connected().await {
                        info!("WhatsApp reconnected on its own");
                        continue;
                    }
                    if let Err(e) = self.build_and_run_bot(reasons_tx.clone()).await {
                        error!("WhatsApp rebuild failed: {e}");
                        let _ = reasons_tx.send(DisconnectReason::BuildFailed);
                    }
                }
            }
        }
    }

    pub(super) async fn abort_bot(&self) {
        *self.client.lock().await = None;
        if let Some(handle) = self.bot_handle.lock().await.take() {
            handle.abort();
        }
    }
}
