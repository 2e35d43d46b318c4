//! Shared leads registry (`leads.json`).

use chrono::{DateTime, Utc};
use sable_core::error::SableError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub jid: String,
    pub name: String,
    pub project: String,
    pub timestamp: DateTime<Utc>,
}

pub struct LeadStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LeadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Record a lead. Returns `false` if this sender already has a lead for the same project.
    pub async fn add(&self, jid: &str, name: &str, project: &str) -> Result<bool, SableError> {
        let _guard = self.write_lock.lock().await;
        let mut leads = self.all().await?;
        if leads
            .iter()
            .any(|l| l.jid == jid && l.project.eq_ignore_ascii_case(project.trim()))
        {
            return Ok(false);
        }
        leads.push(Lead {
            jid: jid.to_string(),
            name: name.trim().to_string(),
            project: project.trim().to_string(),
            timestamp: Utc::now(),
        });
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&leads)?).await?;
        info!("new lead: {} ({jid}) for {}", name.trim(), project.trim());
        Ok(true)
    }

    /// Every recorded lead, oldest first.
    pub async fn all(&self) -> Result<Vec<Lead>, SableError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!("corrupt leads file {}: {e}", self.path.display());
                Vec::new()
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_dedupe() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LeadStore::new(tmp.path().join("leads.json"));
        assert!(store.add("1@s", "Ali", "E-commerce site").await.unwrap());
        assert!(!store.add("1@s", "Ali", "e-commerce site ").await.unwrap());
        assert!(store.add("1@s", "Ali", "Mobile app").await.unwrap());
        assert!(store.add("2@s", "Sara", "E-commerce site").await.unwrap());

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].project, "E-commerce site");
        assert_eq!(all[2].jid, "2@s");
    }

    #[tokio::test]
    async fn test_all_when_missing_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LeadStore::new(tmp.path().join("leads.json"));
        assert!(store.all().await.unwrap().is_empty());
    }
}
