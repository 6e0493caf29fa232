//! URL canonicalization used to match the "same" page across two sites.
//!
//! A normalized path key is the URL path with slashes trimmed, each segment
//! lowercased, a trailing `.html` dropped and `_` folded into `-`. Two URLs
//! that differ only in those respects produce the same key, whatever their
//! host. The empty key stands for the site root.

use url::Url;

/// Canonicalize `url` into a normalized path key.
///
/// Any input string produces a key: absolute URLs are parsed, anything else
/// is treated as a raw path (query and fragment are ignored either way).
pub fn normalize_path(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => raw_path(url).to_string(),
    };

    path.trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(normalize_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_segment(segment: &str) -> String {
    let lowered = segment.to_lowercase();
    let stem = lowered.strip_suffix(".html").unwrap_or(&lowered);
    stem.replace('_', "-")
}

/// Path component of a string that `Url` refused to parse.
fn raw_path(input: &str) -> &str {
    let end = input.find(['?', '#']).unwrap_or(input.len());
    let without_query = &input[..end];

    let authority_start = if let Some(idx) = without_query.find("://") {
        Some(idx + 3)
    } else if without_query.starts_with("//") {
        Some(2)
    } else {
        None
    };

    match authority_start {
        Some(start) => {
            let rest = &without_query[start..];
            rest.find('/').map(|idx| &rest[idx..]).unwrap_or("")
        }
        None => without_query,
    }
}

/// Network authority (`host[:port]`) of an absolute URL.
///
/// Returns `None` when the URL cannot be parsed or has no host; such a URL
/// cannot be crawled.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Strip query and fragment from an absolute URL.
pub fn clean_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Whether the URL's path ends with one of `extensions` (case-insensitive).
pub fn has_ignored_extension(url: &str, extensions: &[String]) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => raw_path(url).to_lowercase(),
    };
    extensions
        .iter()
        .filter(|ext| !ext.is_empty())
        .any(|ext| path.ends_with(&ext.to_lowercase()))
}

/// Filesystem-safe slug for a page capture, `index` for the site root.
pub fn screenshot_slug(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => raw_path(url).to_string(),
    };
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "index".to_string()
    } else {
        trimmed.replace(['/', '.'], "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_suffix_variants_collapse() {
        assert_eq!(normalize_path("/About.html"), normalize_path("/about"));
        assert_eq!(normalize_path("/About_Us.html"), normalize_path("/about-us"));
        assert_eq!(
            normalize_path("https://legacy.example.com/About_Us.html"),
            normalize_path("https://new.example.com/about-us/")
        );
    }

    #[test]
    fn test_distinct_paths_stay_distinct() {
        assert_ne!(normalize_path("/about"), normalize_path("/contact"));
        assert_ne!(normalize_path("/contact"), normalize_path("/contact-us"));
    }

    #[test]
    fn test_root_is_empty_key() {
        assert_eq!(normalize_path("https://example.com"), "");
        assert_eq!(normalize_path("https://example.com/"), "");
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("///"), "");
    }

    #[test]
    fn test_nested_segments() {
        assert_eq!(
            normalize_path("https://example.com/Services/Web_Design.HTML/"),
            "services/web-design"
        );
        assert_eq!(
            normalize_path("https://example.com/Services/Web_Design.html"),
            "services/web-design"
        );
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        assert_eq!(normalize_path("https://example.com/news?page=2#top"), "news");
        assert_eq!(normalize_path("/news?page=2"), "news");
    }

    #[test]
    fn test_empty_segments_dropped() {
        assert_eq!(normalize_path("https://example.com//a//b/"), "a/b");
    }

    #[test]
    fn test_arbitrary_strings_produce_a_key() {
        assert_eq!(normalize_path("not a url"), "not a url");
        assert_eq!(normalize_path("//cdn.example.com/Img_1.html"), "img-1");
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://example.com/a"), Some("example.com".to_string()));
        assert_eq!(
            domain_of("http://localhost:8080/a"),
            Some("localhost:8080".to_string())
        );
        assert_eq!(domain_of("not a url"), None);
        assert_eq!(domain_of("mailto:someone@example.com"), None);
    }

    #[test]
    fn test_clean_url_strips_query_and_fragment() {
        assert_eq!(
            clean_url("https://example.com/a?x=1#frag"),
            Some("https://example.com/a".to_string())
        );
        assert_eq!(clean_url("nope"), None);
    }

    #[test]
    fn test_ignored_extension() {
        let exts = vec![".pdf".to_string(), ".mp4".to_string()];
        assert!(has_ignored_extension("https://example.com/files/Report.PDF", &exts));
        assert!(has_ignored_extension("https://example.com/v.mp4?autoplay=1", &exts));
        assert!(!has_ignored_extension("https://example.com/pdf-guide", &exts));
        assert!(!has_ignored_extension("https://example.com/a.pdf", &[]));
    }

    #[test]
    fn test_screenshot_slug() {
        assert_eq!(screenshot_slug("https://example.com/"), "index");
        assert_eq!(screenshot_slug("https://example.com/a/b.html"), "a_b_html");
    }
}
