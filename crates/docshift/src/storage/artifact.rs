//! Owned handle to a transient artifact.
//!
//! An [`Artifact`] is not `Clone`: the request that created it owns it until
//! it is either discarded (immediate removal) or handed to the
//! [`DeletionScheduler`](super::DeletionScheduler), which consumes it.

use super::cleanup::{CleanupResult, remove_path, remove_path_async};
use super::layout::Category;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
    category: Category,
    created_at: SystemTime,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            path: path.into(),
            category,
            created_at: SystemTime::now(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Remove the artifact now, from synchronous code.
    pub fn discard_blocking(self) -> CleanupResult {
        remove_path(&self.path)
    }

    /// Remove the artifact now.
    pub async fn discard(self) -> CleanupResult {
        remove_path_async(&self.path).await
    }
}
