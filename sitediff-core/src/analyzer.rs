//! Image difference analysis of one matched page pair.
//!
//! Both captures are reduced to luminance, aligned to identical dimensions,
//! then scored three ways: mean SSIM, the share of pixels whose luminance
//! moved by more than a threshold, and the connected regions those pixels
//! form. The binarized mask is saved as a diff artifact when a path is given.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::regions::significant_regions;
use crate::ssim::ssim;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Scores for one image pair. A failed analysis leaves every field absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiffAnalysis {
    pub ssim_score: Option<f64>,
    pub diff_percent: Option<f64>,
    pub region_count: usize,
    pub largest_region_percent: f64,
    pub diff_image: Option<PathBuf>,
}

impl DiffAnalysis {
    pub fn has_score(&self) -> bool {
        self.ssim_score.is_some()
    }
}

/// Analyze two image files. Never fails: unreadable or unalignable images
/// produce an all-absent [`DiffAnalysis`].
pub fn analyze(
    path_a: &Path,
    path_b: &Path,
    diff_output: Option<&Path>,
    config: &AnalysisConfig,
) -> DiffAnalysis {
    let started = Instant::now();
    let loaded = load(path_a).and_then(|a| load(path_b).map(|b| (a, b)));
    let analysis = match loaded {
        Ok((a, b)) => analyze_images(&a, &b, diff_output, config),
        Err(e) => {
            warn!("Error in analysis: {}", e);
            DiffAnalysis::default()
        }
    };
    debug!(
        "Analysis of {} vs {} took {:.2}s",
        path_a.display(),
        path_b.display(),
        started.elapsed().as_secs_f64()
    );
    analysis
}

/// Analyze two decoded images. See [`analyze`].
pub fn analyze_images(
    a: &DynamicImage,
    b: &DynamicImage,
    diff_output: Option<&Path>,
    config: &AnalysisConfig,
) -> DiffAnalysis {
    match try_analyze(a, b, diff_output, config) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!("Image difference analysis failed: {}", e);
            DiffAnalysis::default()
        }
    }
}

fn load(path: &Path) -> Result<DynamicImage, AnalysisError> {
    image::open(path).map_err(|source| AnalysisError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

fn try_analyze(
    a: &DynamicImage,
    b: &DynamicImage,
    diff_output: Option<&Path>,
    config: &AnalysisConfig,
) -> Result<DiffAnalysis, AnalysisError> {
    let (gray_a, gray_b) = align(a.to_luma8(), b.to_luma8(), config.max_dimension)?;
    let score = ssim(&gray_a, &gray_b)?;

    let mask = difference_mask(&gray_a, &gray_b, config.pixel_threshold);
    let (width, height) = mask.dimensions();
    let total_pixels = width as f64 * height as f64;
    let diff_pixels = mask.pixels().filter(|p| p[0] != 0).count();
    let diff_percent = diff_pixels as f64 / total_pixels * 100.0;

    let regions = significant_regions(&mask, config.min_region_area);
    let largest_region_percent = regions
        .iter()
        .map(|region| region.area)
        .max_by(f64::total_cmp)
        .map(|area| area / total_pixels * 100.0)
        .unwrap_or(0.0);

    let diff_image = diff_output.and_then(|path| save_mask(&mask, path));

    info!(
        "SSIM: {:.4}, Diff %: {:.2}%, Sig. Regions: {}, Largest Region: {:.2}%",
        score,
        diff_percent,
        regions.len(),
        largest_region_percent
    );

    Ok(DiffAnalysis {
        ssim_score: Some(score),
        diff_percent: Some(diff_percent),
        region_count: regions.len(),
        largest_region_percent,
        diff_image,
    })
}

/// Bring two luminance images to identical dimensions.
///
/// When sizes differ or either is wider or taller than `max_dimension`,
/// both are scaled proportionally to the narrowest width (capped at
/// `max_dimension`), then the taller one is cropped to the shorter height.
/// Images are only ever scaled down.
pub fn align(
    a: GrayImage,
    b: GrayImage,
    max_dimension: u32,
) -> Result<(GrayImage, GrayImage), AnalysisError> {
    let (w1, h1) = a.dimensions();
    let (w2, h2) = b.dimensions();
    if w1 == 0 || h1 == 0 || w2 == 0 || h2 == 0 {
        return Err(AnalysisError::Alignment(format!(
            "empty image ({}x{} vs {}x{})",
            w1, h1, w2, h2
        )));
    }

    let needs_resize = w1 != w2
        || h1 != h2
        || [w1, h1, w2, h2].iter().any(|&d| d > max_dimension);
    if !needs_resize {
        return Ok((a, b));
    }

    let target_width = w1.min(w2).min(max_dimension).max(1);
    let a = scale_to_width(a, target_width);
    let b = scale_to_width(b, target_width);

    let final_height = a.height().min(b.height());
    let a = crop_to_height(a, final_height);
    let b = crop_to_height(b, final_height);

    if a.dimensions() != b.dimensions() {
        return Err(AnalysisError::Alignment(format!(
            "shape mismatch after resize: {:?} vs {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }
    debug!("Aligned images to {}x{}", a.width(), a.height());
    Ok((a, b))
}

fn scale_to_width(img: GrayImage, target_width: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    let target_height = ((height as u64 * target_width as u64) / width as u64).max(1) as u32;
    if (width, height) == (target_width, target_height) {
        img
    } else {
        imageops::resize(&img, target_width, target_height, FilterType::Lanczos3)
    }
}

fn crop_to_height(img: GrayImage, height: u32) -> GrayImage {
    if img.height() == height {
        img
    } else {
        imageops::crop_imm(&img, 0, 0, img.width(), height).to_image()
    }
}

/// Binary mask: 255 where luminance differs by more than `threshold`, else 0.
pub fn difference_mask(a: &GrayImage, b: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let delta = a.get_pixel(x, y)[0].abs_diff(b.get_pixel(x, y)[0]);
        Luma([if delta > threshold { 255 } else { 0 }])
    })
}

fn save_mask(mask: &GrayImage, path: &Path) -> Option<PathBuf> {
    if let Some(parent) = path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!("Could not create {}: {}", parent.display(), e);
        return None;
    }
    match mask.save(path) {
        Ok(()) => {
            debug!("Visual difference image saved: {}", path.display());
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!("Error saving visual diff image to {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_keeps_equal_small_images() {
        let a = GrayImage::new(100, 50);
        let b = GrayImage::new(100, 50);
        let (a, b) = align(a, b, 1920).unwrap();
        assert_eq!(a.dimensions(), (100, 50));
        assert_eq!(b.dimensions(), (100, 50));
    }

    #[test]
    fn test_align_scales_to_narrowest_and_crops() {
        let a = GrayImage::new(200, 400);
        let b = GrayImage::new(100, 300);
        let (a, b) = align(a, b, 1920).unwrap();
        // a scales to 100x200, b stays 100x300 and is cropped to 200.
        assert_eq!(a.dimensions(), (100, 200));
        assert_eq!(b.dimensions(), (100, 200));
    }

    #[test]
    fn test_align_caps_width_at_max_dimension() {
        let a = GrayImage::new(400, 100);
        let b = GrayImage::new(400, 100);
        let (a, b) = align(a, b, 200).unwrap();
        assert_eq!(a.dimensions(), (200, 50));
        assert_eq!(b.dimensions(), (200, 50));
    }

    #[test]
    fn test_align_never_upscales() {
        let a = GrayImage::new(30, 30);
        let b = GrayImage::new(60, 10);
        let (a, b) = align(a, b, 1920).unwrap();
        assert_eq!(a.dimensions(), (30, 5));
        assert_eq!(b.dimensions(), (30, 5));
    }

    #[test]
    fn test_align_rejects_empty_images() {
        assert!(align(GrayImage::new(0, 10), GrayImage::new(10, 10), 1920).is_err());
    }

    #[test]
    fn test_align_always_yields_equal_shapes() {
        let sizes = [(1, 1), (7, 3), (1920, 1080), (2500, 9000), (333, 2), (2, 333)];
        for &(w1, h1) in &sizes {
            for &(w2, h2) in &sizes {
                let (a, b) = align(GrayImage::new(w1, h1), GrayImage::new(w2, h2), 1920).unwrap();
                assert_eq!(a.dimensions(), b.dimensions(), "{}x{} vs {}x{}", w1, h1, w2, h2);
                assert!(a.width() <= w1.min(w2));
            }
        }
    }

    #[test]
    fn test_difference_mask_threshold_is_strict() {
        let a = GrayImage::from_pixel(2, 1, Luma([100]));
        let mut b = a.clone();
        b.put_pixel(0, 0, Luma([130]));
        b.put_pixel(1, 0, Luma([131]));
        let mask = difference_mask(&a, &b, 30);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(1, 0)[0], 255);
    }
}
