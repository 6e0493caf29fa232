//! Joins two crawls on normalized path.

use sitediff_scanner::{CrawlResult, PageRecord};
use std::collections::BTreeSet;

/// A normalized path and the page each crawl captured for it, if any.
#[derive(Debug, Clone, Copy)]
pub struct PagePair<'a> {
    pub normalized_path: &'a str,
    pub page_a: Option<&'a PageRecord>,
    pub page_b: Option<&'a PageRecord>,
}

impl PagePair<'_> {
    pub fn is_matched(&self) -> bool {
        self.page_a.is_some() && self.page_b.is_some()
    }
}

/// Union of both crawls' keys in lexicographic order.
pub fn match_pages(result_a: &CrawlResult, result_b: &CrawlResult) -> Vec<String> {
    result_a
        .keys()
        .chain(result_b.keys())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One pair per key of [`match_pages`]; a side missing from its crawl is `None`.
pub fn pair_pages<'a>(result_a: &'a CrawlResult, result_b: &'a CrawlResult) -> Vec<PagePair<'a>> {
    let keys: BTreeSet<&'a String> = result_a.keys().chain(result_b.keys()).collect();
    keys.into_iter()
        .map(|key| PagePair {
            normalized_path: key.as_str(),
            page_a: result_a.get(key),
            page_b: result_b.get(key),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn crawl(paths: &[&str]) -> CrawlResult {
        paths
            .iter()
            .map(|p| PageRecord {
                normalized_path: p.to_string(),
                title: p.to_string(),
                source_url: format!("https://example.com/{}", p),
                image_path: PathBuf::from(format!("{}.png", p)),
            })
            .collect()
    }

    #[test]
    fn test_union_size() {
        let cases: [(&[&str], &[&str], usize); 4] = [
            (&[], &[], 0),
            (&["", "a"], &[], 2),
            (&["", "a", "b"], &["", "a", "b"], 3),
            (&["", "about", "contact"], &["", "about", "contact-us"], 4),
        ];
        for (a, b, expected) in cases {
            assert_eq!(match_pages(&crawl(a), &crawl(b)).len(), expected);
        }
    }

    #[test]
    fn test_keys_sorted() {
        let keys = match_pages(&crawl(&["b", "d"]), &crawl(&["c", "a", ""]));
        assert_eq!(keys, vec!["", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_pairs_mark_missing_sides() {
        let a = crawl(&["", "about", "contact"]);
        let b = crawl(&["", "about", "contact-us"]);
        let pairs = pair_pages(&a, &b);

        let summary: Vec<(&str, bool, bool)> = pairs
            .iter()
            .map(|p| (p.normalized_path, p.page_a.is_some(), p.page_b.is_some()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("", true, true),
                ("about", true, true),
                ("contact", true, false),
                ("contact-us", false, true),
            ]
        );
        assert_eq!(pairs.iter().filter(|p| p.is_matched()).count(), 2);
    }
}
