//! Transient artifact storage.
//!
//! Category roots, collision-free naming, streamed upload persistence, and
//! deferred deletion of everything the service writes.

pub mod artifact;
pub mod cleanup;
pub mod layout;
pub mod sanitize;
pub mod scheduler;
pub mod sweep;
pub mod upload;

pub use artifact::Artifact;
pub use cleanup::{BestEffort, CleanupError, CleanupResult, Removal, remove_path, remove_path_async};
pub use layout::{Category, StorageLayout, with_appended_extension};
pub use sanitize::{PLACEHOLDER_NAME, lowercase_extension, safe_stem, sanitize};
pub use scheduler::{DeletionScheduler, MAX_DELAY};
pub use sweep::{SweepReport, sweep_stale};
pub use upload::{DEFAULT_CHUNK_SIZE, UploadPersister, persist, persist_and_rewind};
