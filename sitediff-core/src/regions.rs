//! Significant regions of a binarized difference mask.
//!
//! A region is the outermost border of an 8-connected cluster of set
//! pixels. Its area is the area of the polygon through the centres of the
//! border pixels, so enclosed holes count towards it while a one pixel wide
//! stroke has no area at all. Clusters lying inside the hole of another
//! cluster are part of that outer region and are not reported on their own.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Enclosed area in square pixels.
    pub area: f64,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    fn from_border(points: &[Point<u32>]) -> Option<Self> {
        let first = points.first()?;
        let mut region = Region {
            area: polygon_area(points),
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in points {
            region.min_x = region.min_x.min(p.x);
            region.min_y = region.min_y.min(p.y);
            region.max_x = region.max_x.max(p.x);
            region.max_y = region.max_y.max(p.y);
        }
        Some(region)
    }
}

/// Shoelace area of a closed polygon.
fn polygon_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Outer regions of the non-zero pixels of `mask`, in border scan order.
pub fn find_regions(mask: &GrayImage) -> Vec<Region> {
    find_contours::<u32>(mask)
        .iter()
        .filter(|contour| {
            matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
        })
        .filter_map(|contour| Region::from_border(&contour.points))
        .collect()
}

/// Regions enclosing at least `min_area` square pixels.
pub fn significant_regions(mask: &GrayImage, min_area: u32) -> Vec<Region> {
    find_regions(mask)
        .into_iter()
        .filter(|region| region.area >= min_area as f64)
        .collect()
}
