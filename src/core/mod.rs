mod errors;
mod types;

pub use errors::{CloudError, Result};
pub use types::{SessionStatus, UploadId, UploadItem};
