//! REST API server for docshift.
//!
//! An Axum-based HTTP server exposing video downloads and PDF conversions.
//! Every response is either a file attachment or a JSON body
//! `{"error": "<message>"}`.
//!
//! # Endpoints
//!
//! - `GET /youtube/download?url=...` - Download a YouTube video as MP4
//! - `GET /tiktok/download?url=...` - Download a TikTok video as MP4
//! - `POST /pdf/to-excel` - Tables of an uploaded PDF as an `.xlsx` workbook
//! - `POST /pdf/to-word` - Uploaded PDF as a `.docx` document
//! - `POST /pdf/to-image` - Pages of an uploaded PDF as PNGs in a `.zip`
//! - `GET /health` - Health check endpoint
//! - `GET /info` - Server information
//!
//! Uploads are sent as multipart form data in a field named `file`.
//!
//! # Examples
//!
//! ## Embedding the router in your app
//!
//! ```no_run
//! use docshift::{ServiceConfig, api::{ApiState, create_router}, convert::Collaborators};
//! use axum::Router;
//!
//! #[tokio::main]
//! async fn main() -> docshift::Result<()> {
//!     let config = ServiceConfig::default();
//!     let collaborators = Collaborators::system(&config);
//!     let docshift_router = create_router(ApiState::new(config, collaborators)?);
//!
//!     let app: Router = Router::new().nest("/convert", docshift_router);
//!     # let _ = app;
//!     Ok(())
//! }
//! ```
//!
//! # cURL Examples
//!
//! ```bash
//! curl -OJ "http://localhost:8000/youtube/download?url=https://www.youtube.com/watch?v=..."
//! curl -OJ -F "file=@report.pdf" http://localhost:8000/pdf/to-excel
//! curl -OJ -F "file=@report.pdf" http://localhost:8000/pdf/to-image
//! curl http://localhost:8000/health
//! ```

mod error;
mod handlers;
mod pipeline;
mod server;
mod types;

pub use error::{ApiError, NOT_A_PDF_MESSAGE, PDF_FAILURE_CONTEXT};
pub use handlers::ENDPOINTS;
pub use pipeline::UPLOAD_FIELD;
pub use server::{create_router, create_router_with_limits, serve, serve_with_shutdown};
pub use types::{ApiSizeLimits, ApiState, DownloadQuery, ErrorResponse, HealthResponse, InfoResponse};
