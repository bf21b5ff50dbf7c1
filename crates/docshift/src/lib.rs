//! docshift - file conversion and media download service
//!
//! docshift accepts a remote video URL or an uploaded PDF, hands the work to an
//! external engine, and streams the result back as an attachment. Every file
//! it writes is transient: uploads, outputs and scratch directories are
//! removed on a schedule, so disk use stays bounded without an external cron.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docshift::{ServiceConfig, convert::Collaborators};
//!
//! #[tokio::main]
//! async fn main() -> docshift::Result<()> {
//!     let mut config = ServiceConfig::discover()?.unwrap_or_default();
//!     config.apply_env_overrides();
//!     let collaborators = Collaborators::system(&config);
//!     docshift::api::serve(config, collaborators).await
//! }
//! ```
//!
//! # Architecture
//!
//! - **Core Module** (`core`): service configuration and its discovery
//! - **Storage** (`storage`): category roots, upload persistence, deferred deletion
//! - **Convert** (`convert`): collaborator traits and the conversion pipelines built on them
//! - **Workers** (`workers`): bounded pool for blocking conversion work
//! - **PDF** (`pdf`): pdfium-backed table extraction and page rendering
//! - **API** (`api`): the HTTP surface

#![deny(unsafe_code)]

pub mod convert;
pub mod core;
pub mod error;
pub mod storage;
pub mod workers;

#[cfg(feature = "api")]
pub mod api;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use core::ServiceConfig;
pub use error::{DocshiftError, Result};
