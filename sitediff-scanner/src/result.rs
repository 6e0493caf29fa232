use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the serialized crawl inside each run directory.
pub const CRAWLED_DATA_FILE: &str = "crawled_data.json";

/// One captured page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageRecord {
    /// Key this record is stored under; restored from the map key on load.
    #[serde(skip)]
    pub normalized_path: String,
    pub title: String,
    #[serde(rename = "full_url")]
    pub source_url: String,
    #[serde(rename = "img_path")]
    pub image_path: PathBuf,
}

/// Pages of one crawl keyed by normalized path.
///
/// Serializes as `{ "<path>": { "img_path", "title", "full_url" } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CrawlResult {
    pages: BTreeMap<String, PageRecord>,
}

impl CrawlResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, overwriting (and returning) any record with the same key.
    pub fn insert(&mut self, record: PageRecord) -> Option<PageRecord> {
        self.pages.insert(record.normalized_path.clone(), record)
    }

    pub fn get(&self, normalized_path: &str) -> Option<&PageRecord> {
        self.pages.get(normalized_path)
    }

    pub fn contains(&self, normalized_path: &str) -> bool {
        self.pages.contains_key(normalized_path)
    }

    /// Keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.pages.keys()
    }

    pub fn pages(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages.values()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Write `crawled_data.json` into `dir`. An empty crawl is not written.
    pub fn save(&self, dir: &Path) -> Result<Option<PathBuf>> {
        if self.is_empty() {
            warn!("No pages to save for {}", dir.display());
            return Ok(None);
        }

        fs::create_dir_all(dir)?;
        let path = dir.join(CRAWLED_DATA_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        info!("Crawled data saved to {}", path.display());
        Ok(Some(path))
    }

    /// Read `crawled_data.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CRAWLED_DATA_FILE);
        let content = fs::read_to_string(&path)?;
        let mut result: CrawlResult = serde_json::from_str(&content)?;
        for (key, record) in result.pages.iter_mut() {
            record.normalized_path = key.clone();
        }
        info!("Loaded {} pages from {}", result.len(), path.display());
        Ok(result)
    }
}

impl FromIterator<PageRecord> for CrawlResult {
    fn from_iter<I: IntoIterator<Item = PageRecord>>(iter: I) -> Self {
        let mut result = CrawlResult::new();
        for record in iter {
            result.insert(record);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, url: &str) -> PageRecord {
        PageRecord {
            normalized_path: path.to_string(),
            title: format!("Title {}", path),
            source_url: url.to_string(),
            image_path: PathBuf::from(format!("shots/page_{}.png", path)),
        }
    }

    #[test]
    fn test_last_write_wins_on_collision() {
        let mut result = CrawlResult::new();
        assert!(result.insert(record("about", "https://e.com/About")).is_none());
        let replaced = result.insert(record("about", "https://e.com/about_"));
        assert_eq!(replaced.unwrap().source_url, "https://e.com/About");
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("about").unwrap().source_url, "https://e.com/about_");
    }

    #[test]
    fn test_serialized_shape() {
        let result: CrawlResult = vec![record("", "https://e.com/")].into_iter().collect();
        let json: serde_json::Value = serde_json::to_value(&result).unwrap();
        let root = &json[""];
        assert_eq!(root["full_url"], "https://e.com/");
        assert_eq!(root["title"], "Title ");
        assert_eq!(root["img_path"], "shots/page_.png");
        assert!(root.get("normalized_path").is_none());
    }

    #[test]
    fn test_keys_are_sorted() {
        let result: CrawlResult = vec![
            record("contact", "https://e.com/contact"),
            record("", "https://e.com/"),
            record("about", "https://e.com/about"),
        ]
        .into_iter()
        .collect();
        let keys: Vec<&String> = result.keys().collect();
        assert_eq!(keys, vec!["", "about", "contact"]);
    }
}
