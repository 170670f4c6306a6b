use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use super::errors::Result;

/// Upload session id, only used to correlate log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct UploadId(pub Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overall status of one upload action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Uploading,
    Success,
    Error,
}

impl SessionStatus {
    /// `idle -> uploading -> {success, error} -> idle`
    pub fn is_valid_transition(from: SessionStatus, to: SessionStatus) -> bool {
        use SessionStatus::*;

        matches!(
            (from, to),
            (Idle, Uploading) | (Uploading, Success) | (Uploading, Error) | (Success, Idle) | (Error, Idle)
        )
    }
}

/// A file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

impl UploadItem {
    pub fn new(path: impl Into<PathBuf>, file_name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            size,
        }
    }

    /// Reads the name and size from disk.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| super::CloudError::param(format!("Can't read file name of {}", path.display())))?
            .to_string();

        Ok(Self::new(path, file_name, metadata.len()))
    }
}
