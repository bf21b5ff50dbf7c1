//! Service-wide configuration.

pub mod config;

pub use config::{
    CONFIG_FILE_NAME, CleanupConfig, RenderConfig, ServerConfig, ServiceConfig, StorageConfig, ToolsConfig,
    UploadConfig, WorkerConfig,
};
