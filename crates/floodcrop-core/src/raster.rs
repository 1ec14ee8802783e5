use crate::error::{FloodCropError, Result, Shape};

/// A 2D grid of samples, row-major, all operands of a binary operation share
/// the same `(width, height)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster<T> {
    /// Row-major samples, `width * height` long.
    pub data: Vec<T>,
    pub width: usize,
    pub height: usize,
}

/// Single-band classification raster (MLU, WorldCover, cropland exports).
pub type ClassRaster = Raster<u32>;

/// Binary mask, every sample is 0 or 1.
pub type Mask = Raster<u8>;

/// Three-channel colour raster.
pub type RgbRaster = Raster<[u8; 3]>;

impl<T: Copy> Raster<T> {
    /// Create a raster filled with the given value.
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
        }
    }

    /// Wrap an existing row-major buffer. Fails if the buffer length does not
    /// match the dimensions.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(FloodCropError::ShapeMismatch {
                context: "raster buffer",
                expected: (width, height),
                found: (data.len(), 1),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Build a raster from equally long rows. Panics on ragged input.
    pub fn from_rows(rows: &[Vec<T>]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        assert!(rows.iter().all(|r| r.len() == width), "ragged rows");
        Self {
            data: rows.iter().flatten().copied().collect(),
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        self.data[row * self.width + col] = val;
    }

    pub fn shape(&self) -> Shape {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Apply `f` to every sample, keeping the shape.
    pub fn map<U, F: FnMut(T) -> U>(&self, mut f: F) -> Raster<U> {
        Raster {
            data: self.data.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// `Err(ShapeMismatch)` unless `other` has the same dimensions.
    pub fn ensure_same_shape<U>(&self, other: &Raster<U>, context: &'static str) -> Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(FloodCropError::ShapeMismatch {
                context,
                expected: self.shape(),
                found: (other.width, other.height),
            });
        }
        Ok(())
    }
}

impl ClassRaster {
    pub fn max_value(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// 1 where the sample equals `class`, else 0.
    pub fn class_mask(&self, class: u32) -> Mask {
        self.map(|v| u8::from(v == class))
    }

    /// 1 where the sample is non-zero, else 0.
    pub fn nonzero_mask(&self) -> Mask {
        self.map(|v| u8::from(v > 0))
    }

    pub fn count_equal(&self, class: u32) -> u64 {
        self.data.iter().filter(|&&v| v == class).count() as u64
    }
}

impl Mask {
    /// Number of set (non-zero) pixels.
    pub fn count_set(&self) -> u64 {
        self.data.iter().filter(|&&v| v != 0).count() as u64
    }

    pub fn is_binary(&self) -> bool {
        self.data.iter().all(|&v| v <= 1)
    }

    /// Scale {0,1} to {0,255} for viewers.
    pub fn to_display(&self) -> Raster<u8> {
        self.map(|v| if v != 0 { 255 } else { 0 })
    }
}
