//! Raster and JSON I/O.
//!
//! - `read_class_raster`: single-band unsigned raster → `ClassRaster`
//!   (`.tif`/`.tiff` through the `tiff` decoder, anything else through `image`).
//! - `write_mask_tiff`: binary mask → 8-bit TIFF scaled to {0, 255}.
//! - `write_rgb_png`: colour raster → PNG.
//! - `write_json`: pretty-printed JSON record.
//!
//! Read failures of any kind surface as `FloodCropError::Input` carrying the
//! path, so callers can report them per tile.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use image::DynamicImage;
use log::debug;
use serde::Serialize;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};

use crate::error::{FloodCropError, Result};
use crate::raster::{ClassRaster, Mask, Raster, RgbRaster};

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

/// Read a single-band unsigned-integer raster.
pub fn read_class_raster(path: &Path) -> Result<ClassRaster> {
    if !path.is_file() {
        return Err(FloodCropError::input(path, "file not found"));
    }
    let raster = if is_tiff(path) {
        read_tiff(path)?
    } else {
        read_with_image(path)?
    };
    debug!(
        "Read {} ({}x{})",
        path.display(),
        raster.width,
        raster.height
    );
    Ok(raster)
}

fn read_tiff(path: &Path) -> Result<ClassRaster> {
    let file = File::open(path).map_err(|e| FloodCropError::input(path, e))?;
    let mut decoder =
        Decoder::new(BufReader::new(file)).map_err(|e| FloodCropError::input(path, e))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| FloodCropError::input(path, e))?;
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Err(FloodCropError::input(path, "zero-sized raster"));
    }
    let image = decoder
        .read_image()
        .map_err(|e| FloodCropError::input(path, e))?;

    let data: Vec<u32> = match image {
        DecodingResult::U8(v) => v.into_iter().map(u32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(u32::from).collect(),
        DecodingResult::U32(v) => v,
        _ => {
            return Err(FloodCropError::input(
                path,
                "unsupported sample type (expected unsigned 8/16/32-bit)",
            ))
        }
    };
    if data.len() != width * height {
        return Err(FloodCropError::input(
            path,
            format!(
                "expected a single band of {}x{} samples, got {}",
                width,
                height,
                data.len()
            ),
        ));
    }
    Ok(Raster { data, width, height })
}

fn read_with_image(path: &Path) -> Result<ClassRaster> {
    let img = image::open(path).map_err(|e| FloodCropError::input(path, e))?;
    // Only single-band unsigned buffers carry class values.
    let (width, height, data): (u32, u32, Vec<u32>) = match img {
        DynamicImage::ImageLuma8(buf) => {
            let (w, h) = buf.dimensions();
            (w, h, buf.into_raw().into_iter().map(u32::from).collect())
        }
        DynamicImage::ImageLuma16(buf) => {
            let (w, h) = buf.dimensions();
            (w, h, buf.into_raw().into_iter().map(u32::from).collect())
        }
        _ => {
            return Err(FloodCropError::input(
                path,
                "expected a single-band unsigned raster",
            ))
        }
    };
    if width == 0 || height == 0 {
        return Err(FloodCropError::input(path, "zero-sized raster"));
    }
    Raster::from_vec(width as usize, height as usize, data)
}

/// Write an 8-bit single-band TIFF.
pub fn write_gray8_tiff(path: &Path, raster: &Raster<u8>) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file)?;
    encoder.write_image::<colortype::Gray8>(
        raster.width as u32,
        raster.height as u32,
        &raster.data,
    )?;
    Ok(())
}

/// Write a binary mask as an 8-bit TIFF with values {0, 255}.
pub fn write_mask_tiff(path: &Path, mask: &Mask) -> Result<()> {
    write_gray8_tiff(path, &mask.to_display())
}

/// Write a colour raster as PNG.
pub fn write_rgb_png(path: &Path, rgb: &RgbRaster) -> Result<()> {
    let flat: Vec<u8> = rgb.data.iter().flat_map(|px| px.iter().copied()).collect();
    let img = image::RgbImage::from_raw(rgb.width as u32, rgb.height as u32, flat).ok_or(
        FloodCropError::ShapeMismatch {
            context: "rgb buffer",
            expected: rgb.shape(),
            found: (rgb.data.len(), 1),
        },
    )?;
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiff_u8_round_trip_keeps_class_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mlu.tif");
        let src = Raster::from_rows(&[vec![0u8, 1, 2], vec![3, 2, 40]]);
        write_gray8_tiff(&path, &src).unwrap();

        let back = read_class_raster(&path).unwrap();
        assert_eq!(back.shape(), (3, 2));
        assert_eq!(back.data, vec![0, 1, 2, 3, 2, 40]);
    }

    #[test]
    fn mask_tiff_is_scaled_to_255() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.tif");
        write_mask_tiff(&path, &Mask::from_rows(&[vec![0, 1], vec![1, 0]])).unwrap();
        assert_eq!(read_class_raster(&path).unwrap().data, vec![0, 255, 255, 0]);
    }

    #[test]
    fn u16_tiff_is_widened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.tif");
        {
            let file = BufWriter::new(File::create(&path).unwrap());
            let mut enc = TiffEncoder::new(file).unwrap();
            enc.write_image::<colortype::Gray16>(2, 1, &[7u16, 1000]).unwrap();
        }
        assert_eq!(read_class_raster(&path).unwrap().data, vec![7, 1000]);
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = read_class_raster(Path::new("/nope/mlu.tif")).unwrap_err();
        assert!(matches!(err, FloodCropError::Input { .. }));
    }

    #[test]
    fn garbage_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.tif");
        std::fs::write(&path, b"not a tiff").unwrap();
        assert!(matches!(
            read_class_raster(&path),
            Err(FloodCropError::Input { .. })
        ));
    }

    #[test]
    fn rgb_png_is_rejected_as_class_raster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vis.png");
        let mut rgb = RgbRaster::new(2, 1, [0, 0, 0]);
        rgb.set(0, 1, [255, 0, 0]);
        write_rgb_png(&path, &rgb).unwrap();
        assert!(matches!(
            read_class_raster(&path),
            Err(FloodCropError::Input { .. })
        ));
    }

    #[test]
    fn gray_png_keeps_sample_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        image::GrayImage::from_raw(3, 1, vec![0, 40, 255])
            .unwrap()
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        assert_eq!(read_class_raster(&path).unwrap().data, vec![0, 40, 255]);
    }
}
