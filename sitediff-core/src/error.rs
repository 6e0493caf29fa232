use std::path::PathBuf;
use thiserror::Error;

/// Why an image pair could not be analyzed. Never escapes [`crate::analyze`];
/// it is logged and turned into an all-absent result.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("could not read image {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("images cannot be aligned: {0}")]
    Alignment(String),

    #[error("image {width}x{height} is smaller than the {window}x{window} SSIM window")]
    TooSmall { width: u32, height: u32, window: u32 },

    #[error("structural similarity failed: {0}")]
    Similarity(String),
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("A comparison is already in progress.")]
    AlreadyRunning,

    #[error("Failed to get data for {site} ({url}).")]
    NoPages { site: String, url: String },

    #[error("Comparison cancelled.")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] sitediff_scanner::ScanError),

    #[error("Job task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
