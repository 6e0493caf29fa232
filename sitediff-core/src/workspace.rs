//! On-disk layout: `{output_root}/{site_name}/{run_timestamp}/`.

use chrono::Local;
use sitediff_scanner::domain_of;
use sitediff_scanner::result::CRAWLED_DATA_FILE;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Which of the two compared sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// Directory name used when the site URL has no domain.
    pub fn fallback_dir_name(&self) -> &'static str {
        match self {
            Side::A => "website1_default",
            Side::B => "website2_default",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("Website 1"),
            Side::B => f.write_str("Website 2"),
        }
    }
}

/// Directory name for a site: its domain with `.` and `:` replaced by `_`.
pub fn site_dir_name(url: &str, side: Side) -> String {
    match domain_of(url) {
        Some(domain) => domain.replace(['.', ':'], "_"),
        None => side.fallback_dir_name().to_string(),
    }
}

/// Directory names for two sites crawled in the same run. Sites sharing a
/// host (e.g. `http://` and `https://` of one domain) are told apart by a
/// `_1` / `_2` suffix so their captures never land in the same directory.
pub fn paired_site_dir_names(url_a: &str, url_b: &str) -> (String, String) {
    let name_a = site_dir_name(url_a, Side::A);
    let name_b = site_dir_name(url_b, Side::B);
    if name_a == name_b {
        (format!("{}_1", name_a), format!("{}_2", name_b))
    } else {
        (name_a, name_b)
    }
}

/// Local-time run timestamp, e.g. `20250314093005`.
pub fn run_timestamp() -> String {
    Local::now().format(RUN_TIMESTAMP_FORMAT).to_string()
}

pub fn run_dir(output_root: &Path, site_name: &str, timestamp: &str) -> PathBuf {
    output_root.join(site_name).join(timestamp)
}

/// Previous runs holding a `crawled_data.json`, grouped by site, newest first.
/// A missing output root yields an empty listing.
pub fn list_available_crawls(output_root: &Path) -> io::Result<BTreeMap<String, Vec<String>>> {
    let mut grouped = BTreeMap::new();
    if !output_root.exists() {
        warn!("Output directory {} not found", output_root.display());
        return Ok(grouped);
    }

    for site in fs::read_dir(output_root)? {
        let site = site?;
        if !site.file_type()?.is_dir() {
            continue;
        }

        let mut timestamps = Vec::new();
        for run in fs::read_dir(site.path())? {
            let run = run?;
            if run.file_type()?.is_dir() && run.path().join(CRAWLED_DATA_FILE).is_file() {
                timestamps.push(run.file_name().to_string_lossy().into_owned());
            }
        }

        if !timestamps.is_empty() {
            timestamps.sort_unstable_by(|a, b| b.cmp(a));
            grouped.insert(site.file_name().to_string_lossy().into_owned(), timestamps);
        }
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_dir_name() {
        assert_eq!(site_dir_name("https://www.example.com/about", Side::A), "www_example_com");
        assert_eq!(site_dir_name("http://127.0.0.1:8080/", Side::B), "127_0_0_1_8080");
        assert_eq!(site_dir_name("not a url", Side::A), "website1_default");
        assert_eq!(site_dir_name("", Side::B), "website2_default");
    }

    #[test]
    fn test_paired_site_dir_names() {
        assert_eq!(
            paired_site_dir_names("https://old.example.com", "https://new.example.com"),
            ("old_example_com".to_string(), "new_example_com".to_string())
        );
        assert_eq!(
            paired_site_dir_names("http://example.com", "https://example.com/"),
            ("example_com_1".to_string(), "example_com_2".to_string())
        );
    }

    #[test]
    fn test_run_timestamp_shape() {
        let ts = run_timestamp();
        assert_eq!(ts.len(), 14);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_list_available_crawls() {
        let root = tempfile::tempdir().unwrap();
        for (site, run, with_data) in [
            ("example_com", "20240101120000", true),
            ("example_com", "20240301120000", true),
            ("example_com", "20240201120000", false),
            ("empty_site", "20240101120000", false),
            ("new_example_com", "20240401120000", true),
        ] {
            let dir = run_dir(root.path(), site, run);
            fs::create_dir_all(&dir).unwrap();
            if with_data {
                fs::write(dir.join(CRAWLED_DATA_FILE), "{}").unwrap();
            }
        }
        fs::write(root.path().join("stray.txt"), "x").unwrap();

        let crawls = list_available_crawls(root.path()).unwrap();
        assert_eq!(crawls.len(), 2);
        assert_eq!(crawls["example_com"], vec!["20240301120000", "20240101120000"]);
        assert_eq!(crawls["new_example_com"], vec!["20240401120000"]);
    }

    #[test]
    fn test_list_missing_root_is_empty() {
        let crawls = list_available_crawls(Path::new("/nonexistent/sitediff-output")).unwrap();
        assert!(crawls.is_empty());
    }
}
