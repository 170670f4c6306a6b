//! Direct-to-Telegram uploads that bypass the storage backend.

mod telegram;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use async_trait::async_trait;
use tracing::{error, info};
use crate::core::Result;

pub use telegram::BotApiUploader;

/// Fraction of the file sent so far, in `[0, 1]`
pub type FractionCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Provider-assigned id of the stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait DirectUploader: Send + Sync {
    /// Checks credentials before any bytes are sent.
    async fn connect(&self) -> Result<()>;

    async fn send_document(&self, path: &Path, caption: &str, on_progress: FractionCallback) -> Result<DocumentId>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectStatus {
    Idle,
    Connecting,
    Uploading,
    Finalizing,
    Complete(DocumentId),
    Failed(String),
}

impl fmt::Display for DirectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectStatus::Idle => f.write_str("Idle"),
            DirectStatus::Connecting => f.write_str("Connecting..."),
            DirectStatus::Uploading => f.write_str("Uploading... (Do not close)"),
            DirectStatus::Finalizing => f.write_str("Finalizing..."),
            DirectStatus::Complete(_) => f.write_str("Upload Complete!"),
            DirectStatus::Failed(message) => write!(f, "Error: {}", message),
        }
    }
}

/// Whole percent for a provider fraction, clamped to `[0, 100]`.
pub fn fraction_to_percent(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }

    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Drives one direct upload and reports each status change.
pub struct DirectUpload<U> {
    uploader: U,
    on_status: Arc<dyn Fn(&DirectStatus) + Send + Sync>,
}

impl<U: DirectUploader> DirectUpload<U> {
    pub fn new(uploader: U, on_status: Arc<dyn Fn(&DirectStatus) + Send + Sync>) -> Self {
        Self { uploader, on_status }
    }

    fn set(&self, status: DirectStatus) -> DirectStatus {
        (self.on_status)(&status);
        status
    }

    /// Never fails: errors end up in `DirectStatus::Failed`.
    pub async fn run(&self, path: &Path, on_progress: FractionCallback) -> DirectStatus {
        self.set(DirectStatus::Connecting);
        if let Err(err) = self.uploader.connect().await {
            error!(%err, "direct upload connect failed");
            return self.set(DirectStatus::Failed(err.to_string()));
        }

        self.set(DirectStatus::Uploading);
        let caption = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.uploader.send_document(path, &caption, on_progress).await {
            Ok(document_id) => {
                self.set(DirectStatus::Finalizing);
                info!(%document_id, "direct upload complete");
                self.set(DirectStatus::Complete(document_id))
            }
            Err(err) => {
                error!(%err, "direct upload failed");
                self.set(DirectStatus::Failed(err.to_string()))
            }
        }
    }
}
