//! Working-directory storage for uploads and converted outputs.
//!
//! Every file lives flat in a single directory and is named from a freshly
//! generated UUID, so concurrent requests never share a path and no locking
//! is needed. Inputs are `<uuid>_<sanitized name>`, outputs are
//! `<uuid>.<ext>` and double as the download identifier.

mod error;
mod guard;
mod sweep;
mod temp_store;
mod types;

pub use error::StorageError;
pub use guard::ScratchGuard;
pub use sweep::{RetentionSweeper, SweepCallback};
pub use temp_store::{sanitize_filename, TempStore};
pub use types::{partial_path, DownloadId, StoredInput};
