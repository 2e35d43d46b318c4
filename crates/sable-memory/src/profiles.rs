//! Per-sender profile files (`{dir}/<key>.json`).

use crate::file_key;
use chrono::{DateTime, Utc};
use sable_core::error::SableError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(default = "default_relationship")]
    pub relationship: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "unknown")]
    pub device_type: String,
    #[serde(default = "unknown")]
    pub location: String,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
    #[serde(rename = "last_seen", alias = "lastSeen")]
    pub last_seen: DateTime<Utc>,
    #[serde(rename = "created_at", alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

fn default_relationship() -> String {
    "Friend".to_string()
}

fn unknown() -> String {
    "Unknown".to_string()
}

impl Profile {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            relationship: default_relationship(),
            interests: Vec::new(),
            notes: String::new(),
            device_type: unknown(),
            location: unknown(),
            profile_pic_url: None,
            last_seen: now,
            created_at: now,
        }
    }
}

pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, jid: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_key(jid)))
    }

    /// Load the profile for `jid` (creating it if missing) and bump `last_seen`.
    pub async fn get_or_create(&self, jid: &str, name: &str) -> Result<Profile, SableError> {
        let path = self.path_for(jid);
        let mut profile = match tokio::fs::read_to_string(&path).await {
            Ok(data) => serde_json::from_str::<Profile>(&data).unwrap_or_else(|e| {
                debug!("unreadable profile {}: {e}, recreating", path.display());
                Profile::new(name)
            }),
            Err(_) => Profile::new(name),
        };
        profile.last_seen = Utc::now();
        self.save(jid, &profile).await?;
        Ok(profile)
    }

    pub async fn save(&self, jid: &str, profile: &Profile) -> Result<(), SableError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(profile)?;
        tokio::fs::write(self.path_for(jid), json).await?;
        Ok(())
    }
}
