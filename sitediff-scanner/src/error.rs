use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
}

/// Failures raised by a [`PageCapture`](crate::capture::PageCapture) backend.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The browser process could not be started. Fatal for the crawl that needed it.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// A single page could not be rendered or captured.
    #[error("capture of {url} failed: {source}")]
    Page {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScanError>;
