use crate::error::Result;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector is valid"));

/// Fetches pages over plain HTTP to discover outbound links.
#[derive(Clone)]
pub struct LinkFetcher {
    client: Client,
}

impl LinkFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Sitediff/0.1 (https://github.com/trapdoorsec/sitediff)")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(10)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    /// Absolute links of the page at `url`. Non-HTML responses yield no links.
    pub async fn fetch_links(&self, url: &str) -> Result<Vec<String>> {
        debug!("Fetching {} for link discovery", url);
        let response = self.client.get(url).send().await?.error_for_status()?;

        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_lowercase().contains("text/html"))
            .unwrap_or(false);
        if !is_html {
            debug!("{} is not HTML, skipping link discovery", url);
            return Ok(Vec::new());
        }

        let body = response.text().await?;
        Ok(extract_links(&body, url))
    }
}

/// Resolve every anchor `href` in `html` against `base_url`.
///
/// Fragment-only, `javascript:`, `mailto:` and `tel:` links are skipped.
/// Results keep document order and may contain duplicates.
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_href(&base, href.trim()))
        .collect()
}

fn resolve_href(base: &Url, href: &str) -> Option<String> {
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_resolves_relative() {
        let html = r#"<html><body>
            <a href="/about">About</a>
            <a href="contact.html">Contact</a>
            <a href="https://other.example.org/x">Other</a>
        </body></html>"#;
        let links = extract_links(html, "https://example.com/section/");
        assert_eq!(
            links,
            vec![
                "https://example.com/about",
                "https://example.com/section/contact.html",
                "https://other.example.org/x",
            ]
        );
    }

    #[test]
    fn test_extract_links_skips_non_navigational() {
        let html = r##"<a href="#top">Top</a>
            <a href="mailto:a@b.c">Mail</a>
            <a href="javascript:void(0)">JS</a>
            <a href="tel:123">Call</a>
            <a>No href</a>
            <a href="/keep#section">Keep</a>"##;
        let links = extract_links(html, "https://example.com/");
        assert_eq!(links, vec!["https://example.com/keep"]);
    }

    #[test]
    fn test_extract_links_bad_base() {
        assert!(extract_links(r#"<a href="/a">a</a>"#, "not a url").is_empty());
    }
}
