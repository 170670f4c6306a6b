use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::core::CloudError;

/// Pipeline phase that currently owns the uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Client -> server transfer
    Sending,
    OptimizingImage,
    CompressingVideo,
    /// Server -> storage provider transfer
    CloudUpload,
    Processing,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Sending,
        Stage::OptimizingImage,
        Stage::CompressingVideo,
        Stage::CloudUpload,
        Stage::Processing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Sending => "sending",
            Stage::OptimizingImage => "optimizing_image",
            Stage::CompressingVideo => "compressing_video",
            Stage::CloudUpload => "cloud_upload",
            Stage::Processing => "processing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Sending => "Sending to server...",
            Stage::OptimizingImage => "Optimizing image...",
            Stage::CompressingVideo => "Compressing video...",
            Stage::CloudUpload => "Uploading to Cloud...",
            Stage::Processing => "Processing...",
        }
    }

    /// Discrete stages only show their label.
    pub fn reports_percent(&self) -> bool {
        match self {
            Stage::Sending | Stage::CompressingVideo | Stage::CloudUpload => true,
            Stage::OptimizingImage | Stage::Processing => false,
        }
    }

    /// `eta` is the already formatted suffix, possibly empty.
    pub fn status_message(&self, percent: f64, eta: &str) -> String {
        if self.reports_percent() {
            format!("{} {}%{}", self.label(), percent, eta)
        } else {
            self.label().to_string()
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| CloudError::param(format!("unknown stage '{s}'")))
    }
}
