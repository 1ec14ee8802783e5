/// Batch flooded-cropland extraction over a directory of MLU tiles.
///
/// Every sub-directory of the flood root is one tile. Per tile the flood mask
/// is intersected with the best available cropland mask; results land in
/// `<output>/<tile>/` and the batch summary in `<output>/summary_report.json`.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;

use floodcrop_core::{run_batch, MaskEncoding, PipelineConfig, SimulationMode};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EncodingArg {
    Auto,
    ClassCoded,
    Binary,
}

impl From<EncodingArg> for MaskEncoding {
    fn from(a: EncodingArg) -> Self {
        match a {
            EncodingArg::Auto => MaskEncoding::Auto,
            EncodingArg::ClassCoded => MaskEncoding::ClassCoded,
            EncodingArg::Binary => MaskEncoding::Binary,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SimulationArg {
    Realistic,
    Random,
    Disabled,
}

impl From<SimulationArg> for SimulationMode {
    fn from(a: SimulationArg) -> Self {
        match a {
            SimulationArg::Realistic => SimulationMode::Realistic,
            SimulationArg::Random => SimulationMode::Random,
            SimulationArg::Disabled => SimulationMode::Disabled,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "floodcrop",
    about = "Intersect per-tile flood masks with cropland and summarise the batch"
)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root with one sub-directory per tile
    #[arg(long)]
    flood_dir: Option<PathBuf>,

    /// Output root (created if absent)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Root holding <tile>/cropland_strict_mask.tif or agricultural_mask.tif
    #[arg(long)]
    cropland_dir: Option<PathBuf>,

    /// Full-region cropland raster aligned with every tile
    #[arg(long)]
    regional_cropland: Option<PathBuf>,

    /// MLU raster filename inside each tile directory
    #[arg(long)]
    mlu_filename: Option<String>,

    /// MLU class code for flood
    #[arg(long)]
    flood_class: Option<u32>,

    /// Land-cover class code for cropland
    #[arg(long)]
    cropland_class: Option<u32>,

    /// Encoding of the regional cropland raster
    #[arg(long, value_enum)]
    encoding: Option<EncodingArg>,

    /// Ground sample distance in metres
    #[arg(long)]
    pixel_size: Option<f64>,

    /// Fallback when no real cropland data covers a tile
    #[arg(long, value_enum)]
    simulation: Option<SimulationArg>,

    /// Base seed for simulated cropland
    #[arg(long)]
    seed: Option<u64>,

    /// 1 = sequential, 0 = one per core
    #[arg(short, long)]
    workers: Option<usize>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut c = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("cannot load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(v) = self.flood_dir {
            c.flood_dir = v;
        }
        if let Some(v) = self.output_dir {
            c.output_dir = v;
        }
        if self.cropland_dir.is_some() {
            c.cropland_dir = self.cropland_dir;
        }
        if self.regional_cropland.is_some() {
            c.regional_cropland = self.regional_cropland;
        }
        if let Some(v) = self.mlu_filename {
            c.mlu_filename = v;
        }
        if let Some(v) = self.flood_class {
            c.mlu_classes.flood = v;
        }
        if let Some(v) = self.cropland_class {
            c.cropland_class = v;
        }
        if let Some(v) = self.encoding {
            c.cropland_encoding = v.into();
        }
        if let Some(v) = self.pixel_size {
            c.pixel_size_m = v;
        }
        if let Some(v) = self.simulation {
            c.simulation.mode = v.into();
        }
        if let Some(v) = self.seed {
            c.simulation.seed = v;
        }
        if let Some(v) = self.workers {
            c.workers = v;
        }
        Ok(c)
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let config = args.into_config()?;
    info!("Flood directory: {}", config.flood_dir.display());
    info!(
        "MLU file: {} (flood class {}), cropland class {}, pixel {} m",
        config.mlu_filename, config.mlu_classes.flood, config.cropland_class, config.pixel_size_m
    );

    let report = run_batch(config).context("batch aborted")?;
    println!("{}", report.digest());
    Ok(())
}
