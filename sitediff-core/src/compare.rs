//! Builds the comparison entries for two crawls.
//!
//! Every normalized path present in either crawl yields one entry. Matched
//! pairs are analyzed on a bounded pool of blocking tasks; pages found on one
//! side only carry their own metadata and no analysis.

use crate::analyzer::{DiffAnalysis, analyze};
use crate::classify::{Classification, rank_entries};
use crate::config::AnalysisConfig;
use crate::error::JobError;
use crate::matcher::pair_pages;
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use sitediff_scanner::{CrawlResult, PageRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonEntry {
    pub normalized_path: String,
    pub title_a: Option<String>,
    pub title_b: Option<String>,
    pub url_a: Option<String>,
    pub url_b: Option<String>,
    pub image_a: Option<PathBuf>,
    pub image_b: Option<PathBuf>,
    pub thumbnail_a: Option<PathBuf>,
    pub thumbnail_b: Option<PathBuf>,
    /// Present only when both sides captured the page.
    pub analysis: Option<DiffAnalysis>,
    pub classification: Classification,
}

impl ComparisonEntry {
    pub fn ssim_score(&self) -> Option<f64> {
        self.analysis.as_ref().and_then(|a| a.ssim_score)
    }

    pub fn is_matched(&self) -> bool {
        self.image_a.is_some() && self.image_b.is_some()
    }
}

/// `thumb_{filename}` next to the capture.
pub fn thumbnail_path(image: &Path) -> Option<PathBuf> {
    let name = image.file_name()?.to_string_lossy();
    Some(image.with_file_name(format!("thumb_{}", name)))
}

/// Diff artifact for a matched pair, saved beside site A's capture as
/// `diff_{pathSlug}_{captureStem}.png`.
pub fn diff_artifact_path(normalized_path: &str, image_a: &Path) -> PathBuf {
    let slug = if normalized_path.is_empty() {
        "index".to_string()
    } else {
        normalized_path.replace('/', "_")
    };
    let stem = image_a
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    image_a.with_file_name(format!("diff_{}_{}.png", slug, stem))
}

/// Write a thumbnail bounded by the configured box, preserving aspect ratio.
pub fn create_thumbnail(source: &Path, config: &AnalysisConfig) -> Option<PathBuf> {
    let target = thumbnail_path(source)?;
    let img = match image::open(source) {
        Ok(img) => img,
        Err(e) => {
            warn!("Error creating thumbnail from {}: {}", source.display(), e);
            return None;
        }
    };
    let thumb = img.thumbnail(config.thumbnail_width, config.thumbnail_height);
    match thumb.save(&target) {
        Ok(()) => Some(target),
        Err(e) => {
            warn!("Error saving thumbnail {}: {}", target.display(), e);
            None
        }
    }
}

fn build_entry(
    normalized_path: String,
    page_a: Option<PageRecord>,
    page_b: Option<PageRecord>,
    config: &AnalysisConfig,
) -> ComparisonEntry {
    let thumbnail_a = page_a
        .as_ref()
        .and_then(|p| create_thumbnail(&p.image_path, config));
    let thumbnail_b = page_b
        .as_ref()
        .and_then(|p| create_thumbnail(&p.image_path, config));

    let analysis = match (&page_a, &page_b) {
        (Some(a), Some(b)) => {
            debug!("Analyzing '{}'", normalized_path);
            let diff_out = diff_artifact_path(&normalized_path, &a.image_path);
            Some(analyze(&a.image_path, &b.image_path, Some(&diff_out), config))
        }
        (Some(_), None) => {
            info!("Page only in site A: {}", normalized_path);
            None
        }
        (None, Some(_)) => {
            info!("Page only in site B: {}", normalized_path);
            None
        }
        (None, None) => None,
    };

    let classification =
        Classification::from_score(analysis.as_ref().and_then(|a| a.ssim_score));

    ComparisonEntry {
        title_a: page_a.as_ref().map(|p| p.title.clone()),
        title_b: page_b.as_ref().map(|p| p.title.clone()),
        url_a: page_a.as_ref().map(|p| p.source_url.clone()),
        url_b: page_b.as_ref().map(|p| p.source_url.clone()),
        image_a: page_a.map(|p| p.image_path),
        image_b: page_b.map(|p| p.image_path),
        thumbnail_a,
        thumbnail_b,
        analysis,
        classification,
        normalized_path,
    }
}

/// Compare two crawls and return the ranked entries.
///
/// At most `workers` pairs are processed at once. Cancellation is checked
/// before each pair; a cancelled run returns [`JobError::Cancelled`].
pub async fn compare_pages(
    result_a: &CrawlResult,
    result_b: &CrawlResult,
    config: &AnalysisConfig,
    workers: usize,
    cancel: &CancellationToken,
) -> Result<Vec<ComparisonEntry>, JobError> {
    let pairs: Vec<(String, Option<PageRecord>, Option<PageRecord>)> =
        pair_pages(result_a, result_b)
            .into_iter()
            .map(|pair| {
                (
                    pair.normalized_path.to_string(),
                    pair.page_a.cloned(),
                    pair.page_b.cloned(),
                )
            })
            .collect();
    let total = pairs.len();
    info!("Comparing {} page paths with {} workers", total, workers.max(1));

    let config = Arc::new(config.clone());
    let mut entries: Vec<ComparisonEntry> = stream::iter(pairs)
        .map(|(path, page_a, page_b)| {
            let config = Arc::clone(&config);
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return Err(JobError::Cancelled);
                }
                let entry =
                    tokio::task::spawn_blocking(move || build_entry(path, page_a, page_b, &config))
                        .await?;
                Ok(entry)
            }
        })
        .buffer_unordered(workers.max(1))
        .try_collect()
        .await?;

    // Completion order is arbitrary; restore path order so ranking ties are stable.
    entries.sort_by(|a, b| a.normalized_path.cmp(&b.normalized_path));
    rank_entries(&mut entries);

    info!("Comparison finished. Processed {} page paths.", total);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_path() {
        assert_eq!(
            thumbnail_path(Path::new("shots/a/1/page_0_index.png")),
            Some(PathBuf::from("shots/a/1/thumb_page_0_index.png"))
        );
    }

    #[test]
    fn test_diff_artifact_path() {
        assert_eq!(
            diff_artifact_path("docs/intro", Path::new("shots/a/1/page_3_docs_intro.png")),
            PathBuf::from("shots/a/1/diff_docs_intro_page_3_docs_intro.png")
        );
        assert_eq!(
            diff_artifact_path("", Path::new("page_0_index.png")),
            PathBuf::from("diff_index_page_0_index.png")
        );
    }
}
