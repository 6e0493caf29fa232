//! Full-page screenshot capture.
//!
//! The crawler only depends on the [`PageCapture`] trait. [`ChromeCapture`]
//! drives a headless Chrome through the DevTools protocol; tests plug in
//! their own implementation.

use crate::error::CaptureError;
use crate::profile::CaptureConfig;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, info, warn};

const PAGE_HEIGHT_SCRIPT: &str = r#"
    Math.max(
        document.body.scrollHeight, document.documentElement.scrollHeight,
        document.body.offsetHeight, document.documentElement.offsetHeight,
        document.body.clientHeight, document.documentElement.clientHeight
    )
"#;

/// What to capture and how.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub url: String,
    pub viewport_width: u32,
    pub min_height: u32,
    pub hide_selectors: Vec<String>,
}

/// A rendered page: PNG bytes plus the final document title.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub png: Vec<u8>,
    pub title: String,
}

/// Screenshot backend. Implementations may block; the crawler calls them
/// from a blocking task.
pub trait PageCapture: Send + Sync {
    fn capture(&self, request: &CaptureRequest) -> Result<Screenshot, CaptureError>;
}

/// Creates a capture backend for one crawl. Failing here is fatal for that crawl.
pub type CaptureFactory =
    Arc<dyn Fn(&CaptureConfig) -> Result<Arc<dyn PageCapture>, CaptureError> + Send + Sync>;

/// Factory launching a fresh headless Chrome per crawl.
pub fn chrome_factory() -> CaptureFactory {
    Arc::new(
        |config: &CaptureConfig| -> Result<Arc<dyn PageCapture>, CaptureError> {
            Ok(Arc::new(ChromeCapture::launch(config)?) as Arc<dyn PageCapture>)
        },
    )
}

/// Headless Chrome backend. The browser process is torn down when this is dropped.
pub struct ChromeCapture {
    browser: Browser,
    config: CaptureConfig,
}

impl ChromeCapture {
    pub fn launch(config: &CaptureConfig) -> Result<Self, CaptureError> {
        info!(
            "Launching headless browser ({}x{})",
            config.viewport_width, config.min_height
        );
        let options = LaunchOptions::default_builder()
            .path(config.chrome_path.as_ref().map(PathBuf::from))
            .headless(true)
            .sandbox(config.sandbox)
            .window_size(Some((config.viewport_width, config.min_height)))
            .idle_browser_timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| CaptureError::Launch(e.to_string()))?;
        let browser = Browser::new(options).map_err(|e| CaptureError::Launch(e.to_string()))?;

        Ok(Self {
            browser,
            config: config.clone(),
        })
    }

    fn capture_in_tab(&self, tab: &Tab, request: &CaptureRequest) -> anyhow::Result<Screenshot> {
        tab.navigate_to(&request.url)?;
        tab.wait_until_navigated()?;
        sleep(Duration::from_millis(self.config.load_wait_ms));

        let hidden = hide_elements(tab, &request.url, &request.hide_selectors);
        if hidden > 0 {
            sleep(Duration::from_millis(500));
        }

        // Measure at the minimum size so the previous page's height does not leak in.
        set_viewport(tab, request.viewport_width, request.min_height)?;
        sleep(Duration::from_millis(500));

        let content_height = tab
            .evaluate(PAGE_HEIGHT_SCRIPT, false)?
            .value
            .and_then(|v| v.as_f64())
            .map(|h| h.ceil() as u32)
            .unwrap_or(request.min_height);
        let capture_height = content_height.max(request.min_height);
        debug!(
            "[{}] content height {}px, capturing {}x{}",
            request.url, content_height, request.viewport_width, capture_height
        );

        set_viewport(tab, request.viewport_width, capture_height)?;
        sleep(Duration::from_millis(self.config.settle_wait_ms));

        let png = tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)?;
        let title = tab.get_title()?;
        Ok(Screenshot { png, title })
    }
}

impl PageCapture for ChromeCapture {
    fn capture(&self, request: &CaptureRequest) -> Result<Screenshot, CaptureError> {
        let tab = self.browser.new_tab().map_err(|e| CaptureError::Page {
            url: request.url.clone(),
            source: e,
        })?;

        let result = self.capture_in_tab(&tab, request);
        if let Err(e) = tab.close(true) {
            debug!("Could not close tab for {}: {}", request.url, e);
        }

        result.map_err(|e| CaptureError::Page {
            url: request.url.clone(),
            source: e,
        })
    }
}

fn set_viewport(tab: &Tab, width: u32, height: u32) -> anyhow::Result<()> {
    tab.set_bounds(Bounds::Normal {
        left: Some(0),
        top: Some(0),
        width: Some(width as f64),
        height: Some(height as f64),
    })?;
    Ok(())
}

/// Hide every element matching each selector; returns how many were hidden.
fn hide_elements(tab: &Tab, url: &str, selectors: &[String]) -> u64 {
    let mut total = 0;
    for selector in selectors.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let script = match hide_script(selector) {
            Ok(script) => script,
            Err(e) => {
                warn!("[{}] Unusable selector '{}': {}", url, selector, e);
                continue;
            }
        };
        match tab.evaluate(&script, false) {
            Ok(object) => {
                let count = object.value.and_then(|v| v.as_u64()).unwrap_or(0);
                if count > 0 {
                    debug!("[{}] Hid {} element(s) for '{}'", url, count, selector);
                } else {
                    debug!("[{}] No elements found for '{}'", url, selector);
                }
                total += count;
            }
            Err(e) => warn!("[{}] Error hiding '{}': {}", url, selector, e),
        }
    }
    total
}

fn hide_script(selector: &str) -> serde_json::Result<String> {
    let literal = serde_json::to_string(selector)?;
    Ok(format!(
        r#"(() => {{
            const els = document.querySelectorAll({literal});
            els.forEach((el) => {{ el.style.display = 'none'; }});
            return els.length;
        }})()"#
    ))
}
