/// Derives per-tile strict cropland masks from already-downloaded WorldCover
/// rasters.
///
/// For every `<cropland_dir>/<tile>/worldcover_full.tif`, writes
/// `cropland_strict_mask.tif` (values {0, 255}) and `worldcover_stats_strict.json`
/// alongside it. Tiles without a WorldCover raster are reported and skipped.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};
use serde::Serialize;

use floodcrop_core::discover_tiles;
use floodcrop_core::io::{read_class_raster, write_json, write_mask_tiff};
use floodcrop_core::worldcover::{self, StrictMaskStats};

const WORLDCOVER_FILENAME: &str = "worldcover_full.tif";
const STRICT_MASK_FILENAME: &str = "cropland_strict_mask.tif";
const STATS_FILENAME: &str = "worldcover_stats_strict.json";

#[derive(Parser, Debug)]
#[command(
    name = "cropland_prep",
    about = "Derive strict cropland masks from per-tile WorldCover rasters"
)]
struct Args {
    /// Root with one sub-directory per tile
    #[arg(long, default_value = "data/cropland")]
    cropland_dir: PathBuf,

    /// WorldCover class kept as cropland
    #[arg(long, default_value_t = worldcover::CROPLAND)]
    class: u32,

    /// Rewrite masks that already exist
    #[arg(long)]
    overwrite: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default, Serialize)]
struct PrepSummary {
    prepared: Vec<String>,
    already_present: Vec<String>,
    missing_worldcover: Vec<String>,
    total_cropland_pixels: u64,
}

/// Returns the cropland pixel count of the written mask.
fn prepare_tile(dir: &Path, class: u32) -> Result<u64> {
    let src = dir.join(WORLDCOVER_FILENAME);
    let raster = read_class_raster(&src).with_context(|| format!("reading {}", src.display()))?;
    let mask = worldcover::strict_cropland_mask(&raster, class);
    let stats = StrictMaskStats::new(&raster, class, &mask);

    write_mask_tiff(&dir.join(STRICT_MASK_FILENAME), &mask)?;
    write_json(&dir.join(STATS_FILENAME), &stats)?;

    for (value, share) in &stats.class_stats {
        debug!("  {value:>3} {:<24}{:>10} px {:6.2}%", share.name, share.pixels, share.percentage);
    }
    Ok(stats.total_cropland_pixels)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let tiles = discover_tiles(&args.cropland_dir)
        .with_context(|| format!("cannot list {}", args.cropland_dir.display()))?;
    info!("{} tile directories under {}", tiles.len(), args.cropland_dir.display());

    let mut summary = PrepSummary::default();
    for tile in tiles {
        if !tile.dir.join(WORLDCOVER_FILENAME).is_file() {
            warn!("{}: no {}", tile.name, WORLDCOVER_FILENAME);
            summary.missing_worldcover.push(tile.name);
            continue;
        }
        if !args.overwrite && tile.dir.join(STRICT_MASK_FILENAME).is_file() {
            info!("{}: strict mask already present", tile.name);
            summary.already_present.push(tile.name);
            continue;
        }
        let pixels = prepare_tile(&tile.dir, args.class)?;
        info!("{}: {} cropland px", tile.name, pixels);
        summary.total_cropland_pixels += pixels;
        summary.prepared.push(tile.name);
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
