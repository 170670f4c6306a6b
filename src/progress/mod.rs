//! Upload progress tracking: two independent feeds folded into one status line.

mod estimator;
mod eta;
mod session;
mod stage;

pub use estimator::{
    ProgressEstimator, StageClock, StageEstimator, StageSample, StatusLine, TransferEstimator, TransferSample,
};
pub use eta::{estimate_remaining, eta_suffix, format_time, DEFAULT_ETA_CEILING};
pub use session::{SessionEvent, UploadSession};
pub use stage::Stage;
