use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RailyardError {
    #[error("unable to load registry: {0}")]
    #[diagnostic(help("the registry index could not be fetched or parsed; try again later"))]
    RegistryUnavailable(String),

    #[error("registry returned status {status}: {message}")]
    RegistryStatus { status: u16, message: String },

    #[error("manifest request failed: {0}")]
    ManifestHttp(String),

    #[error("manifest returned status {status}: {message}")]
    ManifestStatus { status: u16, message: String },

    #[error("failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("manifest nesting exceeds {0} levels")]
    FlattenDepth(usize),

    #[error("invalid item id: {0}")]
    InvalidItemId(String),

    #[error("invalid page size {0} (expected 9, 27 or 54)")]
    InvalidPageSize(usize),

    #[error("item not found in registry: {0}")]
    ItemNotFound(String),

    #[error("item has no download link: {0}")]
    NoDownloadUrl(String),

    #[error("download request failed: {0}")]
    DownloadHttp(String),

    #[error("download returned status {status}: {message}")]
    DownloadStatus { status: u16, message: String },

    #[error("file already exists: {0} (use --force to overwrite)")]
    DownloadExists(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("registry load cancelled")]
    Cancelled,
}
