pub mod capture;
pub mod crawler;
pub mod error;
pub mod links;
pub mod normalize;
pub mod profile;
pub mod result;

pub use capture::{CaptureFactory, CaptureRequest, ChromeCapture, PageCapture, Screenshot, chrome_factory};
pub use crawler::Crawler;
pub use error::{CaptureError, ScanError};
pub use normalize::{domain_of, normalize_path};
pub use profile::{CaptureConfig, SiteProfile};
pub use result::{CrawlResult, PageRecord};
