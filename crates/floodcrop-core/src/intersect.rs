//! Flood ∩ cropland.
//!
//! A pixel counts as flooded cropland only when it is classified flood *and*
//! classified cropland; the operator is a logical AND, never a union.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::raster::Mask;

/// Pixel counts, areas (m²) and the two coverage ratios of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntersectionStats {
    pub flood_pixels: u64,
    pub cropland_pixels: u64,
    pub flooded_cropland_pixels: u64,
    pub flood_area_m2: f64,
    pub cropland_area_m2: f64,
    pub flooded_cropland_area_m2: f64,
    /// Share of flood pixels that are cropland; 0 when there is no flood.
    pub flood_cropland_ratio: f64,
    /// Share of cropland pixels that are flooded; 0 when there is no cropland.
    pub cropland_flooded_ratio: f64,
}

impl IntersectionStats {
    pub fn from_counts(flood: u64, cropland: u64, flooded_cropland: u64, pixel_size_m: f64) -> Self {
        let pixel_area = pixel_size_m * pixel_size_m;
        Self {
            flood_pixels: flood,
            cropland_pixels: cropland,
            flooded_cropland_pixels: flooded_cropland,
            flood_area_m2: flood as f64 * pixel_area,
            cropland_area_m2: cropland as f64 * pixel_area,
            flooded_cropland_area_m2: flooded_cropland as f64 * pixel_area,
            flood_cropland_ratio: ratio(flooded_cropland, flood),
            cropland_flooded_ratio: ratio(flooded_cropland, cropland),
        }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Pixel-wise AND of two masks of equal shape.
pub fn intersect(a: &Mask, b: &Mask) -> Result<Mask> {
    a.ensure_same_shape(b, "intersection")?;
    Ok(Mask {
        data: a
            .data
            .iter()
            .zip(&b.data)
            .map(|(&x, &y)| u8::from(x != 0 && y != 0))
            .collect(),
        width: a.width,
        height: a.height,
    })
}

/// Intersect the flood and cropland masks and derive the tile statistics.
pub fn compute_intersection(
    flood: &Mask,
    cropland: &Mask,
    pixel_size_m: f64,
) -> Result<(Mask, IntersectionStats)> {
    let flooded_cropland = intersect(flood, cropland)?;
    let stats = IntersectionStats::from_counts(
        flood.count_set(),
        cropland.count_set(),
        flooded_cropland.count_set(),
        pixel_size_m,
    );
    Ok((flooded_cropland, stats))
}
