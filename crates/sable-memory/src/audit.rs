//! Audit log: one line per chat message in and out of Sable.

use chrono::Utc;
use sable_core::error::SableError;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

const MAX_TEXT_CHARS: usize = 500;

/// Direction of an audited message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }
}

/// An entry to write to the audit log.
pub struct AuditEntry<'a> {
    pub direction: Direction,
    pub sender: &'a str,
    pub text: &'a str,
}

/// Append-only text log at `{data_dir}/logs/messages.log`.
pub struct AuditLogger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Write an entry to the audit log.
    pub async fn log(&self, entry: &AuditEntry<'_>) -> Result<(), SableError> {
        let line = format_line(entry);
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;

        debug!("audit: {}", line.trim_end());
        Ok(())
    }
}

fn format_line(entry: &AuditEntry<'_>) -> String {
    let collapsed = entry.text.split_whitespace().collect::<Vec<_>>().join(" ");
    let text: String = if collapsed.chars().count() > MAX_TEXT_CHARS {
        let cut: String = collapsed.chars().take(MAX_TEXT_CHARS).collect();
        format!("{cut}...")
    } else {
        collapsed
    };
    format!(
        "[{}] [{}] [{}] {}\n",
        Utc::now().to_rfc3339(),
        entry.direction.as_str(),
        entry.sender,
        text
    )
}
