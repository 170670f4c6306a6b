use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use crate::core::{CloudError, Result, SessionStatus, UploadId, UploadItem};
use super::estimator::{
    ProgressEstimator, StageEstimator, StageSample, StatusLine, TransferEstimator, TransferSample,
};
use super::eta::DEFAULT_ETA_CEILING;

/// Inbound events, processed strictly in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started,
    Transfer(TransferSample),
    Stage(StageSample),
    Completed,
    Failed(String),
    Dismissed,
}

/// State of one upload action, owned by whoever initiated it
#[derive(Debug, Clone)]
pub struct UploadSession {
    id: UploadId,
    items: Vec<UploadItem>,
    status: SessionStatus,
    transfer: TransferEstimator,
    stage: StageEstimator,
    line: StatusLine,
    failure: Option<String>,
}

impl UploadSession {
    pub fn new(items: Vec<UploadItem>) -> Self {
        Self::with_eta_ceiling(items, DEFAULT_ETA_CEILING)
    }

    pub fn with_eta_ceiling(items: Vec<UploadItem>, ceiling: Duration) -> Self {
        Self {
            id: UploadId::new(),
            items,
            status: SessionStatus::Idle,
            transfer: TransferEstimator::new(),
            stage: StageEstimator::new(ceiling),
            line: StatusLine::default(),
            failure: None,
        }
    }

    pub fn id(&self) -> UploadId {
        self.id
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|item| item.size).sum()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn status_line(&self) -> &StatusLine {
        &self.line
    }

    /// Reason of the last failure, for logs only.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Toast title for the current status.
    pub fn headline(&self) -> String {
        match self.status {
            SessionStatus::Idle => String::new(),
            SessionStatus::Uploading => format!("Uploading {} item(s)", self.items.len()),
            SessionStatus::Success => format!("{} items added", self.items.len()),
            SessionStatus::Error => "Upload failed".to_string(),
        }
    }

    /// Applies one event. A rejected status transition leaves the session untouched.
    pub fn apply(&mut self, event: SessionEvent, now: Instant) -> Result<&StatusLine> {
        match event {
            SessionEvent::Started => {
                self.transition(SessionStatus::Uploading)?;
                self.transfer.start(now);
                self.stage.reset();
                self.failure = None;
                self.line = StatusLine::new(0.0, "Starting...");
                info!(upload_id = %self.id, items = self.items.len(), "upload started");
            }
            SessionEvent::Transfer(sample) => {
                if self.accepts_samples() {
                    self.line = self.transfer.advance(sample, now);
                    debug!(upload_id = %self.id, sent = sample.bytes_sent, total = sample.bytes_total, "transfer progress");
                }
            }
            SessionEvent::Stage(sample) => {
                if self.accepts_samples() {
                    self.line = self.stage.advance(sample, now);
                    debug!(upload_id = %self.id, stage = %sample.stage, percent = sample.percent, "stage progress");
                }
            }
            SessionEvent::Completed => {
                self.transition(SessionStatus::Success)?;
                self.line = StatusLine::new(100.0, self.headline());
                info!(upload_id = %self.id, "upload finished");
            }
            SessionEvent::Failed(reason) => {
                self.transition(SessionStatus::Error)?;
                warn!(upload_id = %self.id, %reason, "upload failed");
                self.failure = Some(reason);
                self.line = StatusLine::new(self.line.percent, self.headline());
            }
            SessionEvent::Dismissed => {
                self.transition(SessionStatus::Idle)?;
                self.stage.reset();
                self.line = StatusLine::default();
            }
        }

        Ok(&self.line)
    }

    fn accepts_samples(&self) -> bool {
        if self.status != SessionStatus::Uploading {
            debug!(upload_id = %self.id, status = ?self.status, "sample ignored");
            return false;
        }

        true
    }

    fn transition(&mut self, to: SessionStatus) -> Result<()> {
        if !SessionStatus::is_valid_transition(self.status, to) {
            return Err(CloudError::InvalidTransition { from: self.status, to });
        }

        self.status = to;
        Ok(())
    }
}
