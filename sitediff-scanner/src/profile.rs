use crate::normalize::normalize_path;
use serde::{Deserialize, Serialize};

pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1920;
pub const DEFAULT_MIN_HEIGHT: u32 = 1080;

/// Per-site crawl behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteProfile {
    /// CSS selectors hidden (`display: none`) before each capture.
    pub hide_selectors: Vec<String>,
    /// Path suffixes that are never captured nor followed, e.g. `.pdf`.
    pub ignored_extensions: Vec<String>,
    /// Pages that are captured but whose links are not followed.
    pub stop_urls: Vec<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            hide_selectors: Vec::new(),
            ignored_extensions: vec![".pdf".to_string(), ".mp4".to_string()],
            stop_urls: Vec::new(),
        }
    }
}

impl SiteProfile {
    pub fn with_hide_selectors(mut self, selectors: Vec<String>) -> Self {
        self.hide_selectors = selectors;
        self
    }

    pub fn with_ignored_extensions(mut self, extensions: Vec<String>) -> Self {
        self.ignored_extensions = extensions;
        self
    }

    pub fn with_stop_urls(mut self, urls: Vec<String>) -> Self {
        self.stop_urls = urls;
        self
    }

    /// Stop entries match on normalized path, so `/Contact.html` stops `/contact`.
    pub fn is_stop_url(&self, url: &str) -> bool {
        if self.stop_urls.is_empty() {
            return false;
        }
        let key = normalize_path(url);
        self.stop_urls
            .iter()
            .any(|stop| normalize_path(stop) == key)
    }
}

/// Browser settings for the screenshot backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub viewport_width: u32,
    /// Lower bound on capture height; short pages are padded to it.
    pub min_height: u32,
    /// Wait after navigation before touching the DOM.
    pub load_wait_ms: u64,
    /// Wait after each viewport resize.
    pub settle_wait_ms: u64,
    pub chrome_path: Option<String>,
    pub sandbox: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            min_height: DEFAULT_MIN_HEIGHT,
            load_wait_ms: 3000,
            settle_wait_ms: 1500,
            chrome_path: None,
            sandbox: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_ignores_documents_and_video() {
        let profile = SiteProfile::default();
        assert_eq!(profile.ignored_extensions, vec![".pdf", ".mp4"]);
        assert!(profile.hide_selectors.is_empty());
    }

    #[test]
    fn test_stop_url_matches_normalized_path() {
        let profile = SiteProfile::default()
            .with_stop_urls(vec!["https://old.example.com/Contact_Us.html".to_string()]);
        assert!(profile.is_stop_url("https://old.example.com/contact-us"));
        assert!(!profile.is_stop_url("https://old.example.com/about"));
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let profile: SiteProfile =
            serde_json::from_str(r##"{"hide_selectors": ["#alertBanner"]}"##).unwrap();
        assert_eq!(profile.hide_selectors, vec!["#alertBanner"]);
        assert_eq!(profile.ignored_extensions, vec![".pdf", ".mp4"]);
    }
}
