pub mod apod;
pub mod config;
pub mod date;
pub mod desktop;
pub mod index;
pub mod lock;
pub mod pipeline;
pub mod store;
pub mod utils;

use std::path::PathBuf;

pub use apod::{ApodClient, ApodEntry};
pub use config::ApodConfig;
pub use desktop::WallpaperManager;
pub use index::{MetadataIndex, Record};
pub use pipeline::{IngestOutcome, IngestPipeline};
pub use store::{ContentDigest, ContentStore};

/// Name of the cache directory created under the working directory.
pub const CACHE_DIR_NAME: &str = "APOD_image_cache";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cache storage unavailable at {}: {reason}", .path.display())]
    StorageUnavailable { path: PathBuf, reason: String },
    #[error("Storage I/O error on {}: {source}", .path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cache at {} is in use by another run", .0.display())]
    CacheLocked(PathBuf),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Source error: {0}")]
    Source(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Index error: {0}")]
    Index(#[from] rusqlite::Error),
    #[error("Index write failed, blob left at {}: {source}", .blob.display())]
    IndexWrite {
        blob: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Desktop environment error: {0}")]
    DesktopEnv(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stage of the ingest the error surfaced from, used to qualify messages.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "input",
            Error::StorageUnavailable { .. } | Error::StorageIo { .. } | Error::CacheLocked(_) => {
                "storage"
            }
            Error::Network(_) | Error::Source(_) | Error::UnsupportedMediaType(_) => "fetch",
            Error::Index(_) | Error::IndexWrite { .. } => "index",
            Error::Io(_) => "io",
            Error::DesktopEnv(_) => "wallpaper",
            Error::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
