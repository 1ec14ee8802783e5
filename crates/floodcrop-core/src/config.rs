//! Pipeline configuration.
//!
//! Every class value, threshold and filename the pipeline uses lives here;
//! nothing is hard-coded per tile. Defaults match the Sentinel MLU /
//! ESA WorldCover deployment (10 m pixels, flood = 2, cropland = 40).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FloodCropError, Result};

/// Class codes of the 4-class land/water/flood/nodata raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MluClasses {
    pub land: u32,
    pub permanent_water: u32,
    pub flood: u32,
    pub nodata: u32,
}

impl Default for MluClasses {
    fn default() -> Self {
        Self {
            land: 0,
            permanent_water: 1,
            flood: 2,
            nodata: 3,
        }
    }
}

/// How a full-region cropland raster encodes cropland.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaskEncoding {
    /// Max sample > 100 means an exported binary mask (0/255), otherwise
    /// the raster is class-coded.
    #[default]
    Auto,
    /// Cropland is `value == cropland_class`.
    ClassCoded,
    /// Cropland is `value > 0`.
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    /// Floodplain-biased: dense cropland near flood, sparse elsewhere.
    #[default]
    Realistic,
    /// Uniform coin flip per pixel.
    Random,
    /// No synthetic cropland; tiles without real data fail.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub mode: SimulationMode,
    /// Dilation iterations applied to the flood mask (pixels).
    pub dilation_radius: usize,
    /// Cropland probability inside the dilated floodplain.
    pub inside_probability: f64,
    /// Cropland probability outside the floodplain.
    pub outside_probability: f64,
    /// Cropland probability in `random` mode.
    pub random_probability: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: SimulationMode::Realistic,
            dilation_radius: 10,
            inside_probability: 0.8,
            outside_probability: 0.2,
            random_probability: 0.5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root holding one sub-directory per tile.
    pub flood_dir: PathBuf,
    /// Root for per-tile outputs and the summary report.
    pub output_dir: PathBuf,
    /// Root holding `<tile_name>/<mask file>` cropland masks.
    pub cropland_dir: Option<PathBuf>,
    /// Full-region cropland raster, assumed aligned with every tile.
    pub regional_cropland: Option<PathBuf>,
    pub mlu_filename: String,
    pub mlu_classes: MluClasses,
    pub cropland_class: u32,
    pub cropland_encoding: MaskEncoding,
    pub strict_mask_filename: String,
    pub legacy_mask_filename: String,
    /// Ground sample distance in metres.
    pub pixel_size_m: f64,
    pub simulation: SimulationConfig,
    /// 1 = sequential, 0 = one worker per core, n = pool of n.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flood_dir: PathBuf::from("data/flood"),
            output_dir: PathBuf::from("data/results"),
            cropland_dir: None,
            regional_cropland: None,
            mlu_filename: "MK0_MLU_1111008_01_20200816.tif".to_string(),
            mlu_classes: MluClasses::default(),
            cropland_class: 40,
            cropland_encoding: MaskEncoding::Auto,
            strict_mask_filename: "cropland_strict_mask.tif".to_string(),
            legacy_mask_filename: "agricultural_mask.tif".to_string(),
            pixel_size_m: 10.0,
            simulation: SimulationConfig::default(),
            workers: 1,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file; absent keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Area of one pixel in square metres.
    pub fn pixel_area_m2(&self) -> f64 {
        self.pixel_size_m * self.pixel_size_m
    }

    /// Startup checks. Any failure here aborts before tile work begins.
    pub fn validate(&self) -> Result<()> {
        if !self.flood_dir.is_dir() {
            return Err(FloodCropError::Config(format!(
                "flood directory does not exist: {}",
                self.flood_dir.display()
            )));
        }
        if !self.pixel_size_m.is_finite() || self.pixel_size_m <= 0.0 {
            return Err(FloodCropError::Config(format!(
                "pixel size must be positive, got {}",
                self.pixel_size_m
            )));
        }
        if self.mlu_filename.is_empty() {
            return Err(FloodCropError::Config("MLU filename is empty".into()));
        }

        let sim = &self.simulation;
        for (name, p) in [
            ("inside_probability", sim.inside_probability),
            ("outside_probability", sim.outside_probability),
            ("random_probability", sim.random_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(FloodCropError::Config(format!(
                    "simulation.{name} must be in [0, 1], got {p}"
                )));
            }
        }

        let c = &self.mlu_classes;
        let codes = [c.land, c.permanent_water, c.flood, c.nodata];
        for (i, a) in codes.iter().enumerate() {
            if codes[i + 1..].contains(a) {
                return Err(FloodCropError::Config(format!(
                    "MLU class codes must be distinct, {a} appears twice"
                )));
            }
        }
        Ok(())
    }
}
