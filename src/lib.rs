pub mod api;
pub mod config;
pub mod core;
pub mod direct;
pub mod logging;
pub mod progress;
pub mod push;

pub use core::{CloudError, Result, SessionStatus, UploadId, UploadItem};

pub use api::{CloudClient, UploadRequest};
pub use config::Config;
pub use progress::{SessionEvent, Stage, StageSample, StatusLine, TransferSample, UploadSession};
pub use push::PushChannel;

#[cfg(test)]
mod tests;
