//! Mean structural similarity of two luminance images.
//!
//! Scoring is delegated to `image-compare` (MSSIM over 8x8 windows). Images
//! smaller than one window are rejected rather than scored on a partial
//! window, and pixel-identical images score exactly 1.0.

use crate::error::AnalysisError;
use image::GrayImage;
use image_compare::Algorithm;

pub const WINDOW: u32 = 8;

/// Mean SSIM of two equally sized luminance images, in `[-1, 1]`.
pub fn ssim(a: &GrayImage, b: &GrayImage) -> Result<f64, AnalysisError> {
    if a.dimensions() != b.dimensions() {
        return Err(AnalysisError::Alignment(format!(
            "{:?} vs {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }
    let (width, height) = a.dimensions();
    if width < WINDOW || height < WINDOW {
        return Err(AnalysisError::TooSmall {
            width,
            height,
            window: WINDOW,
        });
    }

    if a.as_raw() == b.as_raw() {
        return Ok(1.0);
    }

    let similarity = image_compare::gray_similarity_structure(&Algorithm::MSSIMSimple, a, b)
        .map_err(|e| AnalysisError::Similarity(format!("{:?}", e)))?;
    if similarity.score.is_nan() {
        return Err(AnalysisError::Similarity("score is NaN".to_string()));
    }
    Ok(similarity.score.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(width: u32, height: u32, seed: u32) -> GrayImage {
        let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
        GrayImage::from_fn(width, height, |_, _| {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            image::Luma([(state >> 16) as u8])
        })
    }

    #[test]
    fn test_identical_images_score_exactly_one() {
        let img = pattern(40, 30, 7);
        assert_eq!(ssim(&img, &img).unwrap(), 1.0);
    }

    #[test]
    fn test_symmetric() {
        let a = pattern(16, 16, 3);
        let b = pattern(16, 16, 4);
        assert!((ssim(&a, &b).unwrap() - ssim(&b, &a).unwrap()).abs() < 1e-9);
    }

    #[test]
    fn test_closer_luminance_scores_higher() {
        let base = GrayImage::from_pixel(16, 16, image::Luma([100]));
        let near = GrayImage::from_pixel(16, 16, image::Luma([110]));
        let far = GrayImage::from_pixel(16, 16, image::Luma([220]));
        let near_score = ssim(&base, &near).unwrap();
        let far_score = ssim(&base, &far).unwrap();
        assert!(near_score < 1.0);
        assert!(far_score < near_score, "{} vs {}", far_score, near_score);
    }

    #[test]
    fn test_inverted_image_scores_low() {
        let a = pattern(32, 32, 9);
        let inverted = GrayImage::from_fn(32, 32, |x, y| image::Luma([255 - a.get_pixel(x, y)[0]]));
        let score = ssim(&a, &inverted).unwrap();
        assert!(score < 0.0, "score {}", score);
        assert!(score >= -1.0);
    }

    #[test]
    fn test_small_change_scores_high() {
        let a = pattern(64, 64, 5);
        let mut b = a.clone();
        b.put_pixel(10, 10, image::Luma([a.get_pixel(10, 10)[0].wrapping_add(128)]));
        let score = ssim(&a, &b).unwrap();
        assert!(score > 0.95 && score < 1.0, "score {}", score);
    }

    #[test]
    fn test_rejects_tiny_and_mismatched_images() {
        let tiny = GrayImage::new(7, 20);
        assert!(matches!(ssim(&tiny, &tiny), Err(AnalysisError::TooSmall { .. })));
        let a = GrayImage::new(10, 10);
        let b = GrayImage::new(10, 11);
        assert!(matches!(ssim(&a, &b), Err(AnalysisError::Alignment(_))));
    }
}
