//! ESA WorldCover land-cover classes.
//!
//! Used to derive per-tile strict cropland masks from a full WorldCover raster
//! and to print class breakdowns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::raster::{ClassRaster, Mask};

pub const CROPLAND: u32 = 40;

const CLASSES: &[(u32, &str)] = &[
    (10, "Tree cover"),
    (20, "Shrubland"),
    (30, "Grassland"),
    (40, "Cropland"),
    (50, "Built-up"),
    (60, "Bare/sparse vegetation"),
    (70, "Snow and ice"),
    (80, "Permanent water bodies"),
    (90, "Herbaceous wetland"),
    (95, "Mangroves"),
    (100, "Moss and lichen"),
];

/// Human-readable name of a WorldCover class value.
pub fn class_name(value: u32) -> Option<&'static str> {
    CLASSES.iter().find(|(v, _)| *v == value).map(|(_, n)| *n)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassShare {
    pub name: String,
    pub pixels: u64,
    /// Share of all pixels in the raster, 0–100.
    pub percentage: f64,
}

/// Pixel count and percentage for every value present in `raster`. Values
/// outside the catalogue are named `Unknown (<value>)`.
pub fn class_breakdown(raster: &ClassRaster) -> BTreeMap<u32, ClassShare> {
    let mut counts: BTreeMap<u32, u64> = BTreeMap::new();
    for &v in &raster.data {
        *counts.entry(v).or_default() += 1;
    }
    let total = raster.len() as f64;
    counts
        .into_iter()
        .map(|(value, pixels)| {
            let name = class_name(value)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Unknown ({value})"));
            let share = ClassShare {
                name,
                pixels,
                percentage: pixels as f64 / total * 100.0,
            };
            (value, share)
        })
        .collect()
}

/// Cropland only: 1 where the class equals `class`.
pub fn strict_cropland_mask(raster: &ClassRaster, class: u32) -> Mask {
    raster.class_mask(class)
}

/// Record written next to a derived strict mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrictMaskStats {
    pub definition: String,
    pub included_class: u32,
    pub class_name: String,
    pub class_stats: BTreeMap<u32, ClassShare>,
    pub total_cropland_pixels: u64,
}

impl StrictMaskStats {
    pub fn new(raster: &ClassRaster, class: u32, mask: &Mask) -> Self {
        Self {
            definition: "strict".into(),
            included_class: class,
            class_name: format!("{} only", class_name(class).unwrap_or("Unknown")),
            class_stats: class_breakdown(raster),
            total_cropland_pixels: mask.count_set(),
        }
    }
}
