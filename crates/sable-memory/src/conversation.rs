//! Per-sender conversation transcripts.
//!
//! Cached in memory and persisted as `{dir}/history_<key>.json`. The persona
//! system prompt is not stored; it is rebuilt for every request.

use crate::file_key;
use sable_core::{context::ContextEntry, error::SableError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct ConversationStore {
    dir: PathBuf,
    max_history: usize,
    cache: Mutex<HashMap<String, Vec<ContextEntry>>>,
}

impl ConversationStore {
    pub fn new(dir: impl Into<PathBuf>, max_history: usize) -> Self {
        Self {
            dir: dir.into(),
            max_history: max_history.max(1),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    fn path_for(&self, sender: &str) -> PathBuf {
        self.dir.join(format!("history_{}.json", file_key(sender)))
    }

    /// Transcript for `sender`, oldest first.
    pub async fn history(&self, sender: &str) -> Vec<ContextEntry> {
        let mut cache = self.cache.lock().await;
        self.load_into(&mut cache, sender).await.clone()
    }

    /// Append an entry, trim to the window, and persist.
    pub async fn push(&self, sender: &str, entry: ContextEntry) -> Result<(), SableError> {
        let mut cache = self.cache.lock().await;
        let max = self.max_history;
        let entries = self.load_into(&mut cache, sender).await;
        entries.push(entry);
        trim_history(entries, max);
        let snapshot = entries.clone();
        save(&self.path_for(sender), &snapshot).await
    }

    /// Forget everything about `sender`: cache and file.
    pub async fn reset(&self, sender: &str) -> Result<(), SableError> {
        self.cache.lock().await.remove(sender);
        let path = self.path_for(sender);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("conversation reset for {sender}");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_into<'a>(
        &self,
        cache: &'a mut HashMap<String, Vec<ContextEntry>>,
        sender: &str,
    ) -> &'a mut Vec<ContextEntry> {
        if !cache.contains_key(sender) {
            let mut loaded = load(&self.path_for(sender)).await;
            trim_history(&mut loaded, self.max_history);
            cache.insert(sender.to_string(), loaded);
        }
        cache.entry(sender.to_string()).or_default()
    }
}

/// Drop the oldest entries until at most `max` remain.
pub fn trim_history(entries: &mut Vec<ContextEntry>, max: usize) {
    if entries.len() > max {
        let excess = entries.len() - max;
        entries.drain(..excess);
    }
}

async fn load(path: &Path) -> Vec<ContextEntry> {
    match tokio::fs::read_to_string(path).await {
        Ok(data) => match serde_json::from_str::<Vec<ContextEntry>>(&data) {
            Ok(entries) => {
                debug!("loaded {} history entries from {}", entries.len(), path.display());
                entries
                    .into_iter()
                    .filter(|e| e.role == "user" || e.role == "assistant")
                    .collect()
            }
            Err(e) => {
                warn!("corrupt history file {}: {e}", path.display());
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    }
}

async fn save(path: &Path, entries: &[ContextEntry]) -> Result<(), SableError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
