//! Binary morphology on masks.
//!
//! `dilate` grows a mask by `radius` iterations of the 4-connected cross
//! structuring element with a zero border. After `radius` iterations a pixel
//! is set iff some set pixel lies within city-block distance `radius`, so the
//! result is computed in two passes over a capped distance field instead of
//! `radius` full sweeps.
use crate::raster::Mask;

pub fn dilate(mask: &Mask, radius: usize) -> Mask {
    let (w, h) = mask.shape();
    if radius == 0 || mask.is_empty() {
        return mask.map(|v| u8::from(v != 0));
    }

    // Distances above radius are irrelevant; cap keeps the field in range.
    let far = radius + 1;
    let mut dist = vec![far; w * h];
    for (d, &v) in dist.iter_mut().zip(&mask.data) {
        if v != 0 {
            *d = 0;
        }
    }

    // Forward pass: top and left neighbours.
    for r in 0..h {
        for c in 0..w {
            let i = r * w + c;
            let mut d = dist[i];
            if r > 0 {
                d = d.min(dist[i - w] + 1);
            }
            if c > 0 {
                d = d.min(dist[i - 1] + 1);
            }
            dist[i] = d.min(far);
        }
    }
    // Backward pass: bottom and right neighbours.
    for r in (0..h).rev() {
        for c in (0..w).rev() {
            let i = r * w + c;
            let mut d = dist[i];
            if r + 1 < h {
                d = d.min(dist[i + w] + 1);
            }
            if c + 1 < w {
                d = d.min(dist[i + 1] + 1);
            }
            dist[i] = d.min(far);
        }
    }

    Mask {
        data: dist.into_iter().map(|d| u8::from(d <= radius)).collect(),
        width: w,
        height: h,
    }
}
