mod client;
mod listing;
mod progress_stream;
mod types;
mod usage;

pub use client::{CloudClient, UploadRequest};
pub use listing::{files_in_view, next_file, previous_file, share_link, MediaKind, TRASH_RETENTION_DAYS};
pub use progress_stream::{ProgressStream, TransferCallback, TransferCounter};
pub use types::{Dashboard, Envelope, FileRecord, FolderRecord, SharedFolder};
pub use usage::{format_size, parse_size, StorageUsage, STORAGE_LIMIT_BYTES};
