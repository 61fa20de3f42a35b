//! Hooks the control surface supplies: confirmation for destructive actions
//! and the destination for downloaded bytes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::{ClientError, ClientResult};

pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Pre-answered confirmation, e.g. from a `--yes` flag.
pub struct Preconfirmed(pub bool);

impl Confirm for Preconfirmed {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn save(&self, filename: &str, bytes: &[u8]) -> ClientResult<PathBuf>;
}

/// Writes downloads into one directory. Only the final path component of the
/// supplied filename is used.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn target_for(&self, filename: &str) -> ClientResult<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ClientError::Storage(format!("invalid file name '{filename}'")))?;
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save(&self, filename: &str, bytes: &[u8]) -> ClientResult<PathBuf> {
        let target = self.target_for(filename)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|err| {
            ClientError::Storage(format!("failed to create '{}': {err}", self.dir.display()))
        })?;
        tokio::fs::write(&target, bytes).await.map_err(|err| {
            ClientError::Storage(format!("failed to write '{}': {err}", target.display()))
        })?;
        info!(path = %target.display(), size = bytes.len(), "download: saved");
        Ok(target)
    }
}
