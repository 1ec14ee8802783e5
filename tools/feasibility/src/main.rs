/// Single-tile feasibility check: MLU class breakdown, cropland resolution,
/// intersection statistics and an overlay written next to the tile.
/// Meant for eyeballing one tile before a batch run.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use floodcrop_core::cropland::CroplandRequest;
use floodcrop_core::flood::read_flood_mask;
use floodcrop_core::io::{read_class_raster, write_mask_tiff, write_rgb_png};
use floodcrop_core::tile::MASK_FILENAME;
use floodcrop_core::visualize::render_overlay;
use floodcrop_core::{
    class_breakdown, compute_intersection, CroplandResolver, PipelineConfig, SimulationMode, Tile,
};

const VISUALIZATION_FILENAME: &str = "feasibility_visualization.png";

#[derive(Parser, Debug)]
#[command(name = "feasibility", about = "Check one MLU tile end to end")]
struct Args {
    /// Tile directory holding the MLU raster
    tile_dir: PathBuf,

    /// MLU raster filename inside the tile directory
    #[arg(long, default_value = "MK0_MLU_1111008_01_20200816.tif")]
    mlu_filename: String,

    /// Root holding <tile>/cropland_strict_mask.tif
    #[arg(long)]
    cropland_dir: Option<PathBuf>,

    /// WorldCover raster to print a land-cover breakdown for
    #[arg(long)]
    worldcover: Option<PathBuf>,

    /// Never fall back to simulated cropland
    #[arg(long)]
    no_simulation: bool,

    /// Where to write the overlay and mask (default: the tile directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let Some(tile) = Tile::from_dir(&args.tile_dir) else {
        bail!("not a tile directory: {}", args.tile_dir.display());
    };

    let mut config = PipelineConfig {
        cropland_dir: args.cropland_dir.clone(),
        mlu_filename: args.mlu_filename.clone(),
        ..PipelineConfig::default()
    };
    config.simulation.seed = args.seed;
    if args.no_simulation {
        config.simulation.mode = SimulationMode::Disabled;
    }

    // ── Flood ────────────────────────────────────────────────────────────────
    let mlu_path = tile.dir.join(&config.mlu_filename);
    let (flood, counts) = read_flood_mask(&mlu_path, &config.mlu_classes)
        .with_context(|| format!("cannot read {}", mlu_path.display()))?;

    println!("Tile {} ({}x{})", tile.name, flood.width, flood.height);
    for (label, n) in [
        ("land", counts.land),
        ("permanent water", counts.permanent_water),
        ("flood", counts.flood),
        ("nodata", counts.nodata),
    ] {
        println!("  {label:<16}{n:>10} px  {:6.2}%", counts.percent(n));
    }

    if let Some(path) = &args.worldcover {
        let raster = read_class_raster(path)?;
        println!("WorldCover breakdown ({}):", path.display());
        for (value, share) in class_breakdown(&raster) {
            println!(
                "  {value:>3} {:<24}{:>10} px  {:6.2}%",
                share.name, share.pixels, share.percentage
            );
        }
    }

    if !counts.has_flood() {
        println!("No flood pixels; nothing to intersect.");
        return Ok(());
    }

    // ── Cropland and intersection ────────────────────────────────────────────
    let resolver = CroplandResolver::from_config(&config)?;
    let cropland = resolver
        .resolve(&CroplandRequest {
            tile: &tile,
            flood_mask: &flood,
        })
        .context("no cropland source covers this tile")?;
    info!("Cropland from {} ({:?})", cropland.source, cropland.provenance);

    let (flooded_cropland, stats) = compute_intersection(&flood, &cropland.mask, config.pixel_size_m)?;
    println!("Cropland source:        {} ({:?})", cropland.source, cropland.provenance);
    println!("Flood pixels:           {}", stats.flood_pixels);
    println!("Cropland pixels:        {}", stats.cropland_pixels);
    println!("Flooded cropland:       {}", stats.flooded_cropland_pixels);
    println!("Flooded cropland area:  {:.0} m^2", stats.flooded_cropland_area_m2);
    println!("Cropland share of flood {:.2}%", stats.flood_cropland_ratio * 100.0);
    println!("Flooded share of crops  {:.2}%", stats.cropland_flooded_ratio * 100.0);

    // ── Outputs ──────────────────────────────────────────────────────────────
    let out_dir = args.output.unwrap_or_else(|| tile.dir.clone());
    std::fs::create_dir_all(&out_dir)?;
    let overlay = render_overlay(&flood, &cropland.mask, &flooded_cropland)?;
    write_rgb_png(&out_dir.join(VISUALIZATION_FILENAME), &overlay)?;
    write_mask_tiff(&out_dir.join(MASK_FILENAME), &flooded_cropland)?;
    info!("Wrote {} and {} to {}", VISUALIZATION_FILENAME, MASK_FILENAME, out_dir.display());
    Ok(())
}
