//! Best-effort artifact removal.
//!
//! Removal has its own error type. [`CleanupError`] does not convert into
//! [`DocshiftError`](crate::DocshiftError), so the compiler keeps cleanup
//! failures out of request results; callers either inspect the outcome or
//! drop it through [`BestEffort::best_effort`], which logs.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What a removal actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// The path was already gone. Not an error.
    AlreadyGone,
}

/// A removal that failed for a reason other than the path being absent.
#[derive(Debug, Error)]
#[error("failed to remove '{}': {source}", path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub type CleanupResult = std::result::Result<Removal, CleanupError>;

/// Remove a file, or a directory recursively.
pub fn remove_path(path: &Path) -> CleanupResult {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => return classify(path, e),
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(Removal::Removed),
        Err(e) => classify(path, e),
    }
}

/// Async counterpart of [`remove_path`], for use on the event loop.
pub async fn remove_path_async(path: &Path) -> CleanupResult {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) => return classify(path, e),
    };

    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Ok(()) => Ok(Removal::Removed),
        Err(e) => classify(path, e),
    }
}

fn classify(path: &Path, error: std::io::Error) -> CleanupResult {
    if error.kind() == ErrorKind::NotFound {
        Ok(Removal::AlreadyGone)
    } else {
        Err(CleanupError {
            path: path.to_path_buf(),
            source: error,
        })
    }
}

/// Discard a cleanup outcome, logging failures.
pub trait BestEffort {
    fn best_effort(self);
}

impl BestEffort for CleanupResult {
    fn best_effort(self) {
        match self {
            Ok(Removal::Removed) => {}
            Ok(Removal::AlreadyGone) => tracing::debug!("Artifact already removed"),
            Err(e) => tracing::warn!("Ignoring cleanup failure: {}", e),
        }
    }
}
