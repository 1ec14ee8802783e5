use std::path::PathBuf;

use thiserror::Error;

/// Raster dimensions as `(width, height)`.
pub type Shape = (usize, usize);

#[derive(Error, Debug)]
pub enum FloodCropError {
    #[error("cannot read raster {}: {reason}", path.display())]
    Input { path: PathBuf, reason: String },

    #[error("no cropland source available for tile {tile} and simulation is disabled")]
    SourceNotFound { tile: String },

    #[error("shape mismatch in {context}: expected {}x{}, found {}x{}", expected.0, expected.1, found.0, found.1)]
    ShapeMismatch {
        context: &'static str,
        expected: Shape,
        found: Shape,
    },

    #[error("unexpected class value {value} at row {row}, col {col}")]
    UnexpectedClass { value: u32, row: usize, col: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl FloodCropError {
    pub fn input(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Input {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FloodCropError>;
