//! API request and response types.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::convert::Collaborators;
use crate::core::ServiceConfig;
use crate::storage::{DeletionScheduler, StorageLayout, UploadPersister, sweep_stale};
use crate::workers::WorkerPool;

/// API server size limit configuration.
///
/// Default limits are 100 MB, enough for typical PDF uploads.
///
/// ```
/// use docshift::api::ApiSizeLimits;
///
/// let limits = ApiSizeLimits::from_mb(50, 50);
/// assert_eq!(limits.max_request_body_bytes, 50 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ApiSizeLimits {
    /// Maximum size of the entire request body in bytes.
    pub max_request_body_bytes: usize,
    /// Maximum size of a single multipart field in bytes.
    pub max_multipart_field_bytes: usize,
}

impl Default for ApiSizeLimits {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 100 * 1024 * 1024,
            max_multipart_field_bytes: 100 * 1024 * 1024,
        }
    }
}

impl ApiSizeLimits {
    pub fn new(max_request_body_bytes: usize, max_multipart_field_bytes: usize) -> Self {
        Self {
            max_request_body_bytes,
            max_multipart_field_bytes,
        }
    }

    pub fn from_mb(max_request_body_mb: usize, max_multipart_field_mb: usize) -> Self {
        Self {
            max_request_body_bytes: max_request_body_mb * 1024 * 1024,
            max_multipart_field_bytes: max_multipart_field_mb * 1024 * 1024,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server information response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub version: String,
    /// `METHOD /path` for every conversion endpoint.
    pub endpoints: Vec<String>,
}

/// Error body. Every failure, whatever its status code, has this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `?url=` query of the download endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
}

/// API server state.
///
/// Built once at startup from the service configuration; every handler
/// reads storage roots, delays and engines from here.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub config: Arc<ServiceConfig>,
    pub layout: StorageLayout,
    pub uploads: UploadPersister,
    pub scheduler: DeletionScheduler,
    pub workers: WorkerPool,
    pub collaborators: Collaborators,
}

impl ApiState {
    /// Prepare storage roots and start the deletion task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: ServiceConfig, collaborators: Collaborators) -> crate::Result<Self> {
        config.validate()?;

        let layout = StorageLayout::from_config(&config.storage);
        layout.ensure()?;
        if config.storage.sweep_on_startup {
            sweep_stale(&layout, config.storage.sweep_max_age());
        }

        Ok(Self {
            uploads: UploadPersister::new(layout.clone(), config.upload.chunk_size),
            scheduler: DeletionScheduler::start(config.cleanup.max_pending),
            workers: WorkerPool::from_config(&config.workers),
            layout,
            collaborators,
            config: Arc::new(config),
        })
    }
}
