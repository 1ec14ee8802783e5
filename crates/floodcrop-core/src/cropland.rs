//! Cropland mask resolution.
//!
//! A `CroplandResolver` holds an ordered chain of `CroplandSource`s and asks
//! each in turn; the first one that yields a mask wins. Every source carries a
//! fixed `Provenance`, and a tile's mask always comes from exactly one source,
//! so authoritative and simulated pixels never mix within a tile.
//!
//! Chain built from `PipelineConfig` (highest priority first):
//!   1. `strict_mask`    : per-tile `cropland_strict_mask.tif`, value > 0
//!   2. `legacy_mask`    : per-tile `agricultural_mask.tif`, value > 0
//!   3. `regional_raster`: full-region raster, classified once by encoding
//!   4. `simulated_*`    : procedural stand-in, unless disabled

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{MaskEncoding, PipelineConfig, SimulationConfig, SimulationMode};
use crate::error::{FloodCropError, Result};
use crate::io::read_class_raster;
use crate::morphology::dilate;
use crate::raster::{ClassRaster, Mask};
use crate::tile::Tile;

/// Max-sample threshold above which an `Auto`-encoded raster is treated as an
/// exported binary mask (0/255) rather than class-coded.
pub const BINARY_EXPORT_THRESHOLD: u32 = 100;

/// Where a cropland mask came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Authoritative,
    Simulated,
}

/// What a source needs to know about the tile being resolved.
pub struct CroplandRequest<'a> {
    pub tile: &'a Tile,
    pub flood_mask: &'a Mask,
}

/// One strategy in the resolver chain.
pub trait CroplandSource: Send + Sync {
    /// Short identifier recorded in the tile statistics.
    fn name(&self) -> &str;

    fn provenance(&self) -> Provenance;

    /// `Ok(None)` when this source has nothing for the tile; errors are
    /// reserved for data that exists but cannot be used.
    fn resolve(&self, request: &CroplandRequest<'_>) -> Result<Option<Mask>>;
}

/// The winning mask plus its audit trail.
#[derive(Debug, Clone)]
pub struct ResolvedCropland {
    pub mask: Mask,
    pub provenance: Provenance,
    pub source: String,
}

/// Classify a full cropland raster into a binary mask.
pub fn classify_cropland(raster: &ClassRaster, encoding: MaskEncoding, cropland_class: u32) -> Mask {
    let binary = match encoding {
        MaskEncoding::Binary => true,
        MaskEncoding::ClassCoded => false,
        MaskEncoding::Auto => raster.max_value() > BINARY_EXPORT_THRESHOLD,
    };
    if binary {
        raster.nonzero_mask()
    } else {
        raster.class_mask(cropland_class)
    }
}

// ── Tile-local mask files ─────────────────────────────────────────────────────

/// Pre-resolved binary mask stored per tile. Looks under
/// `<cropland_dir>/<tile_name>/<filename>` first, then inside the tile's own
/// directory.
pub struct TileMaskSource {
    name: String,
    filename: String,
    cropland_dir: Option<PathBuf>,
}

impl TileMaskSource {
    pub fn new(name: &str, filename: &str, cropland_dir: Option<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            filename: filename.to_string(),
            cropland_dir,
        }
    }

    fn candidates(&self, tile: &Tile) -> Vec<PathBuf> {
        let mut out = Vec::with_capacity(2);
        if let Some(root) = &self.cropland_dir {
            out.push(root.join(&tile.name).join(&self.filename));
        }
        out.push(tile.dir.join(&self.filename));
        out
    }
}

impl CroplandSource for TileMaskSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn provenance(&self) -> Provenance {
        Provenance::Authoritative
    }

    fn resolve(&self, request: &CroplandRequest<'_>) -> Result<Option<Mask>> {
        let Some(path) = self.candidates(request.tile).into_iter().find(|p| p.is_file()) else {
            return Ok(None);
        };
        debug!("{}: using {}", request.tile.name, path.display());
        let raster = read_class_raster(&path)?;
        Ok(Some(raster.nonzero_mask()))
    }
}

// ── Full-region raster ────────────────────────────────────────────────────────

/// A single cropland raster covering the whole region, pre-aligned with every
/// tile. Loaded and classified once.
pub struct RegionalRasterSource {
    mask: Mask,
}

impl RegionalRasterSource {
    pub fn from_raster(raster: &ClassRaster, encoding: MaskEncoding, cropland_class: u32) -> Self {
        Self {
            mask: classify_cropland(raster, encoding, cropland_class),
        }
    }

    /// `Ok(None)` when the file is absent (source unavailable); read errors
    /// propagate.
    pub fn open(path: &Path, encoding: MaskEncoding, cropland_class: u32) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let raster = read_class_raster(path)?;
        let source = Self::from_raster(&raster, encoding, cropland_class);
        info!(
            "Regional cropland raster {} loaded ({}x{}, {} cropland px)",
            path.display(),
            raster.width,
            raster.height,
            source.mask.count_set()
        );
        Ok(Some(source))
    }
}

impl CroplandSource for RegionalRasterSource {
    fn name(&self) -> &str {
        "regional_raster"
    }

    fn provenance(&self) -> Provenance {
        Provenance::Authoritative
    }

    fn resolve(&self, _request: &CroplandRequest<'_>) -> Result<Option<Mask>> {
        Ok(Some(self.mask.clone()))
    }
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// Procedural stand-in for real cropland data. Seeded per tile so results are
/// reproducible and independent of processing order.
pub struct SimulatedSource {
    config: SimulationConfig,
    name: &'static str,
}

impl SimulatedSource {
    /// `None` when simulation is disabled.
    pub fn new(config: SimulationConfig) -> Option<Self> {
        let name = match config.mode {
            SimulationMode::Realistic => "simulated_realistic",
            SimulationMode::Random => "simulated_random",
            SimulationMode::Disabled => return None,
        };
        Some(Self { config, name })
    }

    fn rng_for(&self, tile_name: &str) -> StdRng {
        StdRng::seed_from_u64(self.config.seed ^ fnv1a(tile_name.as_bytes()))
    }
}

impl CroplandSource for SimulatedSource {
    fn name(&self) -> &str {
        self.name
    }

    fn provenance(&self) -> Provenance {
        Provenance::Simulated
    }

    fn resolve(&self, request: &CroplandRequest<'_>) -> Result<Option<Mask>> {
        let mut rng = self.rng_for(&request.tile.name);
        let flood = request.flood_mask;
        let cfg = &self.config;

        let mask = match cfg.mode {
            SimulationMode::Realistic => {
                let floodplain = dilate(flood, cfg.dilation_radius);
                floodplain.map(|inside| {
                    let p = if inside != 0 {
                        cfg.inside_probability
                    } else {
                        cfg.outside_probability
                    };
                    u8::from(rng.gen::<f64>() < p)
                })
            }
            SimulationMode::Random => {
                flood.map(|_| u8::from(rng.gen::<f64>() < cfg.random_probability))
            }
            SimulationMode::Disabled => return Ok(None),
        };
        Ok(Some(mask))
    }
}

/// Stable 64-bit FNV-1a; `DefaultHasher` output is not guaranteed across
/// releases.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}

// ── Resolver ──────────────────────────────────────────────────────────────────

pub struct CroplandResolver {
    sources: Vec<Box<dyn CroplandSource>>,
}

impl CroplandResolver {
    pub fn new(sources: Vec<Box<dyn CroplandSource>>) -> Self {
        Self { sources }
    }

    /// Build the standard chain. Reading the regional raster happens here, so
    /// a corrupt regional file is a startup error.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        if let Some(root) = &config.cropland_dir {
            if !root.is_dir() {
                warn!(
                    "Cropland directory not found: {} (falling back to tile directories)",
                    root.display()
                );
            }
        }
        let mut sources: Vec<Box<dyn CroplandSource>> = vec![
            Box::new(TileMaskSource::new(
                "strict_mask",
                &config.strict_mask_filename,
                config.cropland_dir.clone(),
            )),
            Box::new(TileMaskSource::new(
                "legacy_mask",
                &config.legacy_mask_filename,
                config.cropland_dir.clone(),
            )),
        ];

        if let Some(path) = &config.regional_cropland {
            match RegionalRasterSource::open(path, config.cropland_encoding, config.cropland_class)? {
                Some(src) => sources.push(Box::new(src)),
                None => warn!(
                    "Regional cropland raster not found: {} (skipping source)",
                    path.display()
                ),
            }
        }

        match SimulatedSource::new(config.simulation.clone()) {
            Some(sim) => sources.push(Box::new(sim)),
            None => info!("Cropland simulation disabled"),
        }

        Ok(Self::new(sources))
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Walk the chain; first hit wins. The winning mask must match the flood
    /// mask's shape.
    pub fn resolve(&self, request: &CroplandRequest<'_>) -> Result<ResolvedCropland> {
        for source in &self.sources {
            let Some(mask) = source.resolve(request)? else {
                continue;
            };
            request.flood_mask.ensure_same_shape(&mask, "cropland mask vs flood mask")?;
            debug!(
                "{}: cropland from {} ({} px)",
                request.tile.name,
                source.name(),
                mask.count_set()
            );
            return Ok(ResolvedCropland {
                mask,
                provenance: source.provenance(),
                source: source.name().to_string(),
            });
        }
        Err(FloodCropError::SourceNotFound {
            tile: request.tile.name.clone(),
        })
    }
}
