//! RGB overlay of cropland, flood and flooded cropland. Diagnostic only; no
//! statistic depends on it.
use crate::error::Result;
use crate::raster::{Mask, RgbRaster};

pub const BACKGROUND: [u8; 3] = [0, 0, 0];
pub const CROPLAND: [u8; 3] = [255, 255, 0]; // yellow
pub const FLOOD: [u8; 3] = [50, 150, 255]; // blue
pub const FLOODED_CROPLAND: [u8; 3] = [255, 50, 50]; // red

/// Paint order is cropland → flood → flooded cropland; each layer overwrites
/// the previous one, so flooded cropland always shows.
pub fn render_overlay(flood: &Mask, cropland: &Mask, flooded_cropland: &Mask) -> Result<RgbRaster> {
    flood.ensure_same_shape(cropland, "overlay cropland")?;
    flood.ensure_same_shape(flooded_cropland, "overlay flooded cropland")?;

    let mut rgb = RgbRaster::new(flood.width, flood.height, BACKGROUND);
    for (layer, colour) in [(cropland, CROPLAND), (flood, FLOOD), (flooded_cropland, FLOODED_CROPLAND)] {
        for (px, &v) in rgb.data.iter_mut().zip(&layer.data) {
            if v != 0 {
                *px = colour;
            }
        }
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::intersect;

    #[test]
    fn priority_is_flooded_cropland_then_flood_then_cropland() {
        let flood = Mask::from_rows(&[vec![0, 1, 1, 0]]);
        let crop = Mask::from_rows(&[vec![1, 0, 1, 0]]);
        let fc = intersect(&flood, &crop).unwrap();
        let rgb = render_overlay(&flood, &crop, &fc).unwrap();
        assert_eq!(rgb.data, vec![CROPLAND, FLOOD, FLOODED_CROPLAND, BACKGROUND]);
    }

    #[test]
    fn rejects_mismatched_layers() {
        let a = Mask::new(2, 2, 0);
        let b = Mask::new(3, 2, 0);
        assert!(render_overlay(&a, &b, &a).is_err());
    }
}
