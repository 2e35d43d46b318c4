//! In-memory per-sender counters and last known presences. Lost on restart.

use chrono::{DateTime, Utc};
use sable_core::message::PresenceStatus;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub messages: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStats {
    pub images: u64,
    pub videos: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Default)]
pub struct StatsTracker {
    users: Mutex<HashMap<String, UserStats>>,
    media: Mutex<HashMap<String, MediaStats>>,
    presences: Mutex<HashMap<String, PresenceStatus>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one inbound message. Returns the updated stats.
    pub async fn record_message(&self, sender: &str) -> UserStats {
        let now = Utc::now();
        let mut users = self.users.lock().await;
        let stats = users.entry(sender.to_string()).or_insert(UserStats {
            messages: 0,
            first_seen: now,
            last_seen: now,
        });
        stats.messages += 1;
        stats.last_seen = now;
        stats.clone()
    }

    pub async fn record_media(&self, sender: &str, kind: MediaKind) {
        let mut media = self.media.lock().await;
        let stats = media.entry(sender.to_string()).or_default();
        match kind {
            MediaKind::Image => stats.images += 1,
            MediaKind::Video => stats.videos += 1,
        }
        stats.last_updated = Some(Utc::now());
    }

    pub async fn user_stats(&self, sender: &str) -> Option<UserStats> {
        self.users.lock().await.get(sender).cloned()
    }

    pub async fn media_stats(&self, sender: &str) -> MediaStats {
        self.media
            .lock()
            .await
            .get(sender)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn set_presence(&self, jid: &str, status: PresenceStatus) {
        self.presences.lock().await.insert(jid.to_string(), status);
    }

    /// Known presences, sorted by JID.
    pub async fn presences(&self) -> Vec<(String, PresenceStatus)> {
        let mut list: Vec<_> = self
            .presences
            .lock()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }
}
