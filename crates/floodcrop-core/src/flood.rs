//! Flood mask extraction from the 4-class MLU raster.
//!
//! The MLU partitions every pixel into land, permanent water, flood or
//! nodata; the flood class becomes the binary flood mask and the per-class
//! tallies travel with it into the statistics record.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::MluClasses;
use crate::error::{FloodCropError, Result};
use crate::io::read_class_raster;
use crate::raster::{ClassRaster, Mask};

/// Pixel tally per MLU class. `land + permanent_water + flood + nodata == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassCounts {
    pub land: u64,
    pub permanent_water: u64,
    pub flood: u64,
    pub nodata: u64,
    pub total: u64,
}

impl ClassCounts {
    pub fn has_flood(&self) -> bool {
        self.flood > 0
    }

    /// Share of `count` in the raster, in percent.
    pub fn percent(&self, count: u64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

/// Derive the flood mask (`value == classes.flood` → 1) and the class tally.
///
/// Samples outside the four configured codes violate the MLU contract and
/// yield `UnexpectedClass`.
pub fn extract_flood_mask(mlu: &ClassRaster, classes: &MluClasses) -> Result<(Mask, ClassCounts)> {
    let mut counts = ClassCounts {
        total: mlu.len() as u64,
        ..ClassCounts::default()
    };
    let mut mask = Mask::new(mlu.width, mlu.height, 0);

    for (i, &v) in mlu.data.iter().enumerate() {
        if v == classes.flood {
            counts.flood += 1;
            mask.data[i] = 1;
        } else if v == classes.land {
            counts.land += 1;
        } else if v == classes.permanent_water {
            counts.permanent_water += 1;
        } else if v == classes.nodata {
            counts.nodata += 1;
        } else {
            return Err(FloodCropError::UnexpectedClass {
                value: v,
                row: i / mlu.width,
                col: i % mlu.width,
            });
        }
    }
    Ok((mask, counts))
}

/// Load an MLU raster from disk and extract its flood mask. Every failure,
/// including out-of-contract class values, is reported as `Input`.
pub fn read_flood_mask(path: &Path, classes: &MluClasses) -> Result<(Mask, ClassCounts)> {
    let mlu = read_class_raster(path)?;
    extract_flood_mask(&mlu, classes).map_err(|e| match e {
        FloodCropError::UnexpectedClass { .. } => FloodCropError::input(path, e),
        other => other,
    })
}
