//! Per-tile processing.
//!
//! A tile is a directory holding one MLU raster, an optional `info.json` and
//! optionally its own cropland mask. `TileProcessor::process` runs
//!
//!   start → flood extracted → { skip (no flood)
//!                             | cropland resolved → intersected → persisted }
//!         → error
//!
//! and always returns a `TileResult`: failures are captured in the record and
//! never escape to the batch.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::cropland::{CroplandRequest, CroplandResolver, Provenance};
use crate::error::{FloodCropError, Result};
use crate::flood::{read_flood_mask, ClassCounts};
use crate::intersect::{compute_intersection, IntersectionStats};
use crate::io::{write_json, write_mask_tiff, write_rgb_png};
use crate::raster::{Mask, RgbRaster};
use crate::visualize::render_overlay;

pub const INFO_FILENAME: &str = "info.json";
pub const MASK_FILENAME: &str = "flooded_cropland_mask.tif";
pub const VISUALIZATION_FILENAME: &str = "visualization.png";
pub const STATS_FILENAME: &str = "stats.json";

pub const REASON_NO_MLU: &str = "MLU file not found";
pub const REASON_NO_FLOOD: &str = "no flood";

/// Half the Web-Mercator world width in metres.
const MERCATOR_HALF_EXTENT: f64 = 20_037_508.34;

// ── Tile and metadata ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub name: String,
    pub dir: PathBuf,
}

impl Tile {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }

    /// A tile named after its directory; non-UTF-8 bytes are replaced.
    /// `None` for paths without a final component.
    pub fn from_dir(dir: &Path) -> Option<Self> {
        let name = dir.file_name()?.to_string_lossy();
        Some(Self::new(name, dir))
    }
}

/// Contents of a tile's `info.json`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileInfo {
    #[serde(default)]
    pub flood_date: Option<String>,
    /// WKT polygon in Web-Mercator metres.
    #[serde(default)]
    pub geom: Option<String>,
}

impl TileInfo {
    /// Metadata is optional: a missing or malformed file yields the default.
    pub fn load(tile_dir: &Path) -> Self {
        let path = tile_dir.join(INFO_FILENAME);
        if !path.is_file() {
            return Self::default();
        }
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(info) => info,
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// `[min_lon, min_lat, max_lon, max_lat]` of the geometry's vertices.
    pub fn bounds_wgs84(&self) -> Option<[f64; 4]> {
        let coords = parse_wkt_coords(self.geom.as_deref()?);
        if coords.is_empty() {
            return None;
        }
        let mut b = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
        for (x, y) in coords {
            let (lon, lat) = mercator_to_wgs84(x, y);
            b[0] = b[0].min(lon);
            b[1] = b[1].min(lat);
            b[2] = b[2].max(lon);
            b[3] = b[3].max(lat);
        }
        Some(b)
    }
}

/// Spherical Web-Mercator metres → (lon, lat) degrees.
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x / MERCATOR_HALF_EXTENT * 180.0;
    let lat = (y / MERCATOR_HALF_EXTENT * std::f64::consts::PI)
        .sinh()
        .atan()
        .to_degrees();
    (lon, lat)
}

/// Every `x y` pair in a WKT string, in order.
fn parse_wkt_coords(wkt: &str) -> Vec<(f64, f64)> {
    wkt.split(|c: char| c == ',' || c == '(' || c == ')')
        .filter_map(|chunk| {
            let mut nums = chunk.split_whitespace().filter_map(|t| t.parse::<f64>().ok());
            Some((nums.next()?, nums.next()?))
        })
        .collect()
}

// ── Result record ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileStatus {
    Success,
    Skip,
    Error,
}

/// Outcome of one tile; also the shape of the per-tile `stats.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileResult {
    pub status: TileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub tile_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flood_date: Option<String>,
    #[serde(default, alias = "cropland_source", skip_serializing_if = "Option::is_none")]
    pub data_source: Option<Provenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cropland_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_wgs84: Option<[f64; 4]>,
    #[serde(flatten)]
    pub class_counts: Option<ClassCounts>,
    #[serde(flatten)]
    pub intersection: Option<IntersectionStats>,
}

impl TileResult {
    fn bare(status: TileStatus, tile_name: &str, reason: Option<String>) -> Self {
        Self {
            status,
            reason,
            tile_name: tile_name.to_string(),
            flood_date: None,
            data_source: None,
            cropland_strategy: None,
            bounds_wgs84: None,
            class_counts: None,
            intersection: None,
        }
    }

    pub fn skip(tile_name: &str, reason: &str, class_counts: Option<ClassCounts>) -> Self {
        Self {
            class_counts,
            ..Self::bare(TileStatus::Skip, tile_name, Some(reason.to_string()))
        }
    }

    pub fn error(tile_name: &str, reason: impl Into<String>) -> Self {
        Self::bare(TileStatus::Error, tile_name, Some(reason.into()))
    }

    pub fn is_success(&self) -> bool {
        self.status == TileStatus::Success
    }

    /// Intersection statistics of a successful tile, zeros otherwise.
    pub fn success_stats(&self) -> IntersectionStats {
        match (&self.status, &self.intersection) {
            (TileStatus::Success, Some(s)) => *s,
            _ => IntersectionStats::default(),
        }
    }
}

// ── Processor ─────────────────────────────────────────────────────────────────

pub struct TileProcessor {
    config: PipelineConfig,
    resolver: CroplandResolver,
}

impl TileProcessor {
    pub fn new(config: PipelineConfig, resolver: CroplandResolver) -> Self {
        Self { config, resolver }
    }

    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let resolver = CroplandResolver::from_config(&config)?;
        Ok(Self::new(config, resolver))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &CroplandResolver {
        &self.resolver
    }

    /// Output directory of a tile; no two tiles share one.
    pub fn output_dir(&self, tile: &Tile) -> PathBuf {
        self.config.output_dir.join(&tile.name)
    }

    /// Process one tile. Never fails: errors become `status = error`.
    pub fn process(&self, tile: &Tile) -> TileResult {
        match self.run(tile) {
            Ok(result) => result,
            Err(e) => {
                warn!("{}: {}", tile.name, e);
                TileResult::error(&tile.name, e.to_string())
            }
        }
    }

    fn run(&self, tile: &Tile) -> Result<TileResult> {
        let mlu_path = tile.dir.join(&self.config.mlu_filename);
        if !mlu_path.is_file() {
            debug!("{}: no MLU at {}", tile.name, mlu_path.display());
            return Ok(TileResult::skip(&tile.name, REASON_NO_MLU, None));
        }

        let info = TileInfo::load(&tile.dir);
        let (flood, counts) = read_flood_mask(&mlu_path, &self.config.mlu_classes)?;
        if !counts.has_flood() {
            debug!("{}: no flood pixels", tile.name);
            return Ok(TileResult::skip(&tile.name, REASON_NO_FLOOD, Some(counts)));
        }

        let request = CroplandRequest {
            tile,
            flood_mask: &flood,
        };
        let cropland = match self.resolver.resolve(&request) {
            Ok(c) => c,
            Err(e) => {
                warn!("{}: cropland loading failed: {}", tile.name, e);
                return Ok(TileResult::error(
                    &tile.name,
                    format!("cropland loading failed: {e}"),
                ));
            }
        };

        let (flooded_cropland, stats) =
            compute_intersection(&flood, &cropland.mask, self.config.pixel_size_m)?;
        let overlay = render_overlay(&flood, &cropland.mask, &flooded_cropland)?;

        let result = TileResult {
            status: TileStatus::Success,
            reason: None,
            tile_name: tile.name.clone(),
            flood_date: info.flood_date.clone(),
            data_source: Some(cropland.provenance),
            cropland_strategy: Some(cropland.source),
            bounds_wgs84: info.bounds_wgs84(),
            class_counts: Some(counts),
            intersection: Some(stats),
        };

        self.persist(tile, &flooded_cropland, &overlay, &result)?;
        info!(
            "{}: {} flooded cropland px of {} flood px",
            tile.name, stats.flooded_cropland_pixels, stats.flood_pixels
        );
        Ok(result)
    }

    /// Write the mask, the overlay and the statistics record. On failure the
    /// files already written are removed, and so is the tile directory if this
    /// call created it.
    fn persist(
        &self,
        tile: &Tile,
        flooded_cropland: &Mask,
        overlay: &RgbRaster,
        result: &TileResult,
    ) -> Result<()> {
        let out_dir = self.output_dir(tile);
        let mask_path = out_dir.join(MASK_FILENAME);
        let vis_path = out_dir.join(VISUALIZATION_FILENAME);
        let stats_path = out_dir.join(STATS_FILENAME);

        let fresh = !out_dir.exists();
        let written = fs::create_dir_all(&out_dir)
            .map_err(FloodCropError::from)
            .and_then(|_| write_mask_tiff(&mask_path, flooded_cropland))
            .and_then(|_| write_rgb_png(&vis_path, overlay))
            .and_then(|_| write_json(&stats_path, result));

        if written.is_err() {
            for path in [&mask_path, &vis_path, &stats_path] {
                let _ = fs::remove_file(path);
            }
            if fresh {
                let _ = fs::remove_dir(&out_dir);
            }
        }
        written
    }
}
