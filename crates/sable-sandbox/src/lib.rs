//! # sable-sandbox
//!
//! A tiny per-sender file area driven by chat commands (`fs create`, `fs read`, ...).
//!
//! Every sender gets `{root}/<sender key>/`. File names go through
//! [`sanitize_file_name`], so a name can never climb out of that directory.

use sable_core::error::SableError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// A sandboxed file with its size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxFile {
    pub name: String,
    pub size: u64,
}

/// Validate a user-supplied file name.
///
/// Returns the trimmed name, or `None` if it is empty or contains `/`, `\` or `..`.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains("..")
    {
        return None;
    }
    Some(trimmed.to_string())
}

/// Human-readable size: `512 B`, `1.50 KB`, `2.00 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let kb = bytes as f64 / 1024.0;
    if kb < 1024.0 {
        return format!("{kb:.2} KB");
    }
    format!("{:.2} MB", kb / 1024.0)
}

fn sender_key(sender: &str) -> String {
    sender
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// File sandbox rooted at `{data_dir}/sandbox`.
#[derive(Debug, Clone)]
pub struct FileSandbox {
    root: PathBuf,
}

impl FileSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory for one sender.
    pub fn dir_for(&self, sender: &str) -> PathBuf {
        self.root.join(sender_key(sender))
    }

    fn resolve(&self, sender: &str, name: &str) -> Result<(PathBuf, String), SableError> {
        let safe = sanitize_file_name(name)
            .ok_or_else(|| SableError::Sandbox(format!("invalid file name '{}'", name.trim())))?;
        Ok((self.dir_for(sender).join(&safe), safe))
    }

    /// Files in the sender's sandbox, sorted by name.
    pub async fn list(&self, sender: &str) -> Result<Vec<SandboxFile>, SableError> {
        let dir = self.dir_for(sender);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_file() {
                files.push(SandboxFile {
                    name: entry.file_name().to_string_lossy().to_string(),
                    size: meta.len(),
                });
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Create (or overwrite) a file. Returns the new file.
    pub async fn create(
        &self,
        sender: &str,
        name: &str,
        content: &str,
    ) -> Result<SandboxFile, SableError> {
        let (path, safe) = self.resolve(sender, name)?;
        ensure_parent(&path).await?;
        tokio::fs::write(&path, content.trim()).await?;
        info!("sandbox: {sender} created {safe}");
        stat(&path, safe).await
    }

    /// Append a new line to an existing file.
    pub async fn append(
        &self,
        sender: &str,
        name: &str,
        content: &str,
    ) -> Result<SandboxFile, SableError> {
        let (path, safe) = self.resolve(sender, name)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(SableError::Sandbox(format!("file '{safe}' not found")));
        }
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await?;
        file.write_all(format!("\n{}", content.trim()).as_bytes())
            .await?;
        file.flush().await?;
        stat(&path, safe).await
    }

    pub async fn read(&self, sender: &str, name: &str) -> Result<String, SableError> {
        let (path, safe) = self.resolve(sender, name)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| SableError::Sandbox(format!("file '{safe}' not found")))
    }

    /// Delete a file. Deleting a missing file succeeds.
    pub async fn delete(&self, sender: &str, name: &str) -> Result<String, SableError> {
        let (path, safe) = self.resolve(sender, name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!("sandbox: {sender} deleted {safe}"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(safe)
    }
}

async fn ensure_parent(path: &Path) -> Result<(), SableError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn stat(path: &Path, name: String) -> Result<SandboxFile, SableError> {
    let size = tokio::fs::metadata(path).await?.len();
    Ok(SandboxFile { name, size })
}
