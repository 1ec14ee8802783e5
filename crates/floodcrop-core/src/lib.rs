//! Flooded-cropland extraction: flood masks from MLU rasters, cropland masks
//! from an ordered source chain, their intersection, and the batch sweep over
//! a directory of tiles.

pub mod batch;
pub mod config;
pub mod cropland;
pub mod error;
pub mod flood;
pub mod intersect;
pub mod io;
pub mod morphology;
pub mod raster;
pub mod report;
pub mod tile;
pub mod visualize;
pub mod worldcover;

pub use batch::{discover_tiles, run_batch, BatchRunner};
pub use config::{MaskEncoding, MluClasses, PipelineConfig, SimulationConfig, SimulationMode};
pub use cropland::{CroplandResolver, CroplandSource, Provenance, ResolvedCropland};
pub use error::{FloodCropError, Result};
pub use flood::{extract_flood_mask, ClassCounts};
pub use intersect::{compute_intersection, intersect, IntersectionStats};
pub use raster::{ClassRaster, Mask, Raster, RgbRaster};
pub use report::{BatchReport, BatchSummary};
pub use tile::{Tile, TileInfo, TileProcessor, TileResult, TileStatus};
pub use worldcover::{class_breakdown, strict_cropland_mask, ClassShare, StrictMaskStats};
