//! Batch summary: totals re-derived from the per-tile records, persisted as
//! `summary_report.json` and rendered as a short text digest.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::write_json;
use crate::tile::{TileResult, TileStatus};

pub const REPORT_FILENAME: &str = "summary_report.json";

const M2_PER_KM2: f64 = 1e6;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_tiles: u64,
    pub success_tiles: u64,
    pub skipped_tiles: u64,
    pub error_tiles: u64,
    /// Successful tiles with at least one flood pixel.
    pub tiles_with_flood: u64,
    pub total_flood_pixels: u64,
    pub total_cropland_pixels: u64,
    pub total_flooded_cropland_pixels: u64,
    pub total_flood_area_km2: f64,
    pub total_cropland_area_km2: f64,
    pub total_flooded_cropland_area_km2: f64,
    /// Flooded cropland as a percentage of all flood pixels; 0 without flood.
    pub flood_cropland_percent: f64,
}

impl BatchSummary {
    /// Sum over `success` records only; `skip` and `error` contribute nothing
    /// but their count.
    pub fn from_results(results: &[TileResult], pixel_size_m: f64) -> Self {
        let mut s = Self {
            total_tiles: results.len() as u64,
            ..Self::default()
        };

        for r in results {
            match r.status {
                TileStatus::Success => s.success_tiles += 1,
                TileStatus::Skip => s.skipped_tiles += 1,
                TileStatus::Error => s.error_tiles += 1,
            }
            let stats = r.success_stats();
            if stats.flood_pixels > 0 {
                s.tiles_with_flood += 1;
            }
            s.total_flood_pixels += stats.flood_pixels;
            s.total_cropland_pixels += stats.cropland_pixels;
            s.total_flooded_cropland_pixels += stats.flooded_cropland_pixels;
        }

        let pixel_area_km2 = pixel_size_m * pixel_size_m / M2_PER_KM2;
        s.total_flood_area_km2 = s.total_flood_pixels as f64 * pixel_area_km2;
        s.total_cropland_area_km2 = s.total_cropland_pixels as f64 * pixel_area_km2;
        s.total_flooded_cropland_area_km2 = s.total_flooded_cropland_pixels as f64 * pixel_area_km2;
        s.flood_cropland_percent = if s.total_flood_pixels > 0 {
            s.total_flooded_cropland_pixels as f64 / s.total_flood_pixels as f64 * 100.0
        } else {
            0.0
        };
        s
    }
}

/// The persisted batch artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    /// Every tile record, in discovery order.
    pub per_tile_results: Vec<TileResult>,
}

impl BatchReport {
    pub fn new(per_tile_results: Vec<TileResult>, pixel_size_m: f64) -> Self {
        Self {
            summary: BatchSummary::from_results(&per_tile_results, pixel_size_m),
            per_tile_results,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// Human-readable digest of the summary.
    pub fn digest(&self) -> String {
        let s = &self.summary;
        let rule = "=".repeat(60);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Batch complete, summary:");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{:<26}{}", "Total tiles:", s.total_tiles);
        let _ = writeln!(out, "{:<26}{}", "Processed successfully:", s.success_tiles);
        let _ = writeln!(out, "{:<26}{}", "Skipped:", s.skipped_tiles);
        let _ = writeln!(out, "{:<26}{}", "Errors:", s.error_tiles);
        let _ = writeln!(out, "{:<26}{}", "Tiles with flood:", s.tiles_with_flood);
        let _ = writeln!(out, "{:<26}{:.2} km^2", "Flood area:", s.total_flood_area_km2);
        let _ = writeln!(out, "{:<26}{:.2} km^2", "Cropland area:", s.total_cropland_area_km2);
        let _ = writeln!(
            out,
            "{:<26}{:.2} km^2",
            "Flooded cropland area:", s.total_flooded_cropland_area_km2
        );
        if s.total_flood_pixels > 0 {
            let _ = writeln!(out, "{:<26}{:.2}%", "Cropland share of flood:", s.flood_cropland_percent);
        }
        let _ = write!(out, "{rule}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cropland::Provenance;
    use crate::flood::ClassCounts;
    use crate::intersect::IntersectionStats;
    use crate::tile::REASON_NO_FLOOD;
    use approx::assert_relative_eq;

    fn success(name: &str, flood: u64, crop: u64, both: u64) -> TileResult {
        TileResult {
            status: TileStatus::Success,
            reason: None,
            tile_name: name.into(),
            flood_date: None,
            data_source: Some(Provenance::Authoritative),
            cropland_strategy: Some("strict_mask".into()),
            bounds_wgs84: None,
            class_counts: Some(ClassCounts {
                land: 100 - flood,
                permanent_water: 0,
                flood,
                nodata: 0,
                total: 100,
            }),
            intersection: Some(IntersectionStats::from_counts(flood, crop, both, 10.0)),
        }
    }

    fn mixed() -> Vec<TileResult> {
        vec![
            success("a", 40, 30, 10),
            TileResult::skip("b", REASON_NO_FLOOD, Some(ClassCounts::default())),
            TileResult::error("c", "cropland loading failed: boom"),
            success("d", 60, 10, 5),
        ]
    }

    #[test]
    fn totals_sum_success_tiles_only() {
        let s = BatchSummary::from_results(&mixed(), 10.0);
        assert_eq!(s.total_tiles, 4);
        assert_eq!(s.success_tiles, 2);
        assert_eq!(s.skipped_tiles, 1);
        assert_eq!(s.error_tiles, 1);
        assert_eq!(s.tiles_with_flood, 2);
        assert_eq!(s.total_flood_pixels, 100);
        assert_eq!(s.total_cropland_pixels, 40);
        assert_eq!(s.total_flooded_cropland_pixels, 15);
        assert_relative_eq!(s.total_flood_area_km2, 0.01, max_relative = 1e-12);
        assert_relative_eq!(s.total_cropland_area_km2, 0.004, max_relative = 1e-12);
        assert_relative_eq!(s.total_flooded_cropland_area_km2, 0.0015, max_relative = 1e-12);
        assert_relative_eq!(s.flood_cropland_percent, 15.0, max_relative = 1e-12);
    }

    #[test]
    fn empty_batch_is_all_zero() {
        let s = BatchSummary::from_results(&[], 10.0);
        assert_eq!(s, BatchSummary::default());
    }

    #[test]
    fn report_json_shape_and_order() {
        let report = BatchReport::new(mixed(), 10.0);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["summary"]["total_tiles"], 4);
        let names: Vec<&str> = v["per_tile_results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["tile_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn digest_mentions_share_only_with_flood() {
        let with_flood = BatchReport::new(mixed(), 10.0).digest();
        assert!(with_flood.contains("Tiles with flood:"));
        assert!(with_flood.contains("15.00%"));

        let without = BatchReport::new(vec![TileResult::error("x", "boom")], 10.0).digest();
        assert!(!without.contains("Cropland share of flood"));
    }

    #[test]
    fn report_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPORT_FILENAME);
        let report = BatchReport::new(mixed(), 10.0);
        report.write(&path).unwrap();
        let back: BatchReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.summary, report.summary);
        assert_eq!(back.per_tile_results.len(), 4);
    }
}
