//! Working grid preparation.
//!
//! The raster handed to the tracer is derived from the source image in up to
//! three steps, each optional:
//!
//! 1. crop to the current viewport (clamped to the image bounds)
//! 2. block-sum by an integer factor `k` ("smoothing"); levels are scaled by
//!    `k²` to match, see [`WorkingGrid::level_scale`]
//! 3. 2x2 box average ("denoising"), which shrinks each axis by one
//!
//! Every buffer is reserved with `try_reserve_exact` so memory pressure
//! surfaces as `ResourceExhausted` instead of aborting the process.

use std::sync::Arc;

use contour_common::{ContourError, PixelRect, Point, Result};
use rayon::prelude::*;
use tracing::debug;

use crate::source::SourceImage;

/// How to derive the working grid from the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingParams {
    /// Block-sum factor; 1 disables downsampling.
    pub factor: usize,
    /// Apply the 2x2 box average after downsampling.
    pub denoise: bool,
    /// Restrict to this native-pixel region.
    pub region: Option<PixelRect>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            factor: 1,
            denoise: false,
            region: None,
        }
    }
}

/// The pixel matrix actually traced, plus what is needed to map its
/// coordinates back to native source pixels.
#[derive(Debug, Clone)]
pub struct WorkingGrid {
    pub data: Arc<[f32]>,
    pub width: usize,
    pub height: usize,
    /// Crop origin in native pixels.
    pub origin: (i64, i64),
    /// Block-sum factor that produced the grid.
    pub factor: usize,
    /// Whether the 2x2 box average ran.
    pub denoised: bool,
}

impl WorkingGrid {
    /// Multiplier from user-facing levels to traced levels.
    ///
    /// Block sums of `k x k` pixels are `k²` times the block mean.
    pub fn level_scale(&self) -> f64 {
        (self.factor * self.factor) as f64
    }

    /// Map a working-grid coordinate to a native source pixel.
    ///
    /// Working cell `i` covers native pixels `i*k .. i*k + k - 1`, whose
    /// center is `i*k + (k-1)/2`. A denoised cell averages cells `i` and
    /// `i+1`, so it sits half a cell further along each axis.
    pub fn to_native(&self, p: Point) -> Point {
        let k = self.factor as f64;
        let shift = if self.denoised { 0.5 } else { 0.0 };
        let center = (k - 1.0) / 2.0;

        Point::new(
            self.origin.0 as f64 + (p.x + shift) * k + center,
            self.origin.1 as f64 + (p.y + shift) * k + center,
        )
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// Builds working grids under a cell budget.
#[derive(Debug, Clone, Copy)]
pub struct RasterSampler {
    max_cells: usize,
}

impl RasterSampler {
    pub fn new(max_cells: usize) -> Self {
        Self { max_cells }
    }

    /// Prepare the working grid for `source`.
    pub fn sample(&self, source: &dyn SourceImage, params: &SamplingParams) -> Result<WorkingGrid> {
        if params.factor == 0 {
            return Err(ContourError::invalid_request("smoothing factor must be >= 1"));
        }

        let (width, height) = (source.width(), source.height());
        let pixels = source.pixels().ok_or(ContourError::NoSourceImage)?;
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(ContourError::NoSourceImage);
        }

        let full = PixelRect::full(width, height);
        let region = match params.region {
            Some(r) => r.clamp_to(width, height).ok_or_else(|| {
                ContourError::invalid_request(format!("viewport {:?} lies outside the image", r))
            })?,
            None => full,
        };

        if region.area() > self.max_cells {
            return Err(ContourError::resource_exhausted("cropping the source image", region.area()));
        }

        let crop_w = region.width as usize;
        let crop_h = region.height as usize;

        // Untouched full frame: share the source buffer
        let (data, w, h): (Arc<[f32]>, usize, usize) =
            if region == full && params.factor == 1 && !params.denoise {
                (pixels, width, height)
            } else {
                let cropped = crop(&pixels, width, &region)?;
                drop(pixels);

                let (buf, w, h) = if params.factor > 1 {
                    block_sum(&cropped, crop_w, crop_h, params.factor)?
                } else {
                    (cropped, crop_w, crop_h)
                };

                if params.denoise {
                    let (avg, w, h) = box_average_2x2(&buf, w, h)?;
                    (avg.into(), w, h)
                } else {
                    (buf.into(), w, h)
                }
            };

        if w < 2 || h < 2 {
            return Err(ContourError::invalid_request(format!(
                "working grid {}x{} is too small to trace",
                w, h
            )));
        }

        debug!(
            width = w,
            height = h,
            origin_x = region.x,
            origin_y = region.y,
            factor = params.factor,
            denoise = params.denoise,
            "Prepared working grid"
        );

        Ok(WorkingGrid {
            data,
            width: w,
            height: h,
            origin: (region.x, region.y),
            factor: params.factor,
            denoised: params.denoise,
        })
    }
}

/// Copy a rectangle out of a row-major image.
pub fn crop(data: &[f32], width: usize, region: &PixelRect) -> Result<Vec<f32>> {
    let (x0, y0) = (region.x as usize, region.y as usize);
    let (w, h) = (region.width as usize, region.height as usize);

    let mut out = Vec::new();
    out.try_reserve_exact(w * h)
        .map_err(|_| ContourError::resource_exhausted("cropping the source image", w * h))?;

    for y in y0..y0 + h {
        out.extend_from_slice(&data[y * width + x0..y * width + x0 + w]);
    }

    Ok(out)
}

/// Sum each `k x k` block into one cell.
///
/// Output is `floor(width/k) x floor(height/k)`; trailing rows and columns
/// that do not fill a block are dropped.
pub fn block_sum(data: &[f32], width: usize, height: usize, k: usize) -> Result<(Vec<f32>, usize, usize)> {
    let new_width = width / k;
    let new_height = height / k;

    if new_width == 0 || new_height == 0 {
        return Err(ContourError::invalid_request(format!(
            "region {}x{} is smaller than the smoothing factor {}",
            width, height, k
        )));
    }

    let mut output = Vec::new();
    output
        .try_reserve_exact(new_width * new_height)
        .map_err(|_| ContourError::resource_exhausted("downsampling", new_width * new_height))?;
    output.resize(new_width * new_height, 0.0f32);

    output
        .par_chunks_mut(new_width)
        .enumerate()
        .for_each(|(out_y, row)| {
            for (out_x, cell) in row.iter_mut().enumerate() {
                let mut sum = 0.0f32;
                for dy in 0..k {
                    let start = (out_y * k + dy) * width + out_x * k;
                    sum += data[start..start + k].iter().sum::<f32>();
                }
                *cell = sum;
            }
        });

    Ok((output, new_width, new_height))
}

/// Replace each cell with the mean of the 2x2 block anchored at it.
///
/// Output is `(width-1) x (height-1)`. NaN samples propagate.
pub fn box_average_2x2(data: &[f32], width: usize, height: usize) -> Result<(Vec<f32>, usize, usize)> {
    if width < 2 || height < 2 {
        return Err(ContourError::invalid_request(format!(
            "grid {}x{} is too small to denoise",
            width, height
        )));
    }

    let new_width = width - 1;
    let new_height = height - 1;

    let mut output = Vec::new();
    output
        .try_reserve_exact(new_width * new_height)
        .map_err(|_| ContourError::resource_exhausted("denoising", new_width * new_height))?;
    output.resize(new_width * new_height, 0.0f32);

    output
        .par_chunks_mut(new_width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let v00 = data[y * width + x];
                let v10 = data[y * width + x + 1];
                let v01 = data[(y + 1) * width + x];
                let v11 = data[(y + 1) * width + x + 1];
                *cell = (v00 + v10 + v01 + v11) / 4.0;
            }
        });

    Ok((output, new_width, new_height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sum_sums_not_averages() {
        let data = vec![
            1.0, 2.0, 3.0, 4.0, 9.0,
            5.0, 6.0, 7.0, 8.0, 9.0,
            9.0, 9.0, 9.0, 9.0, 9.0,
        ];
        let (out, w, h) = block_sum(&data, 5, 3, 2).unwrap();
        assert_eq!((w, h), (2, 1));
        assert_eq!(out, vec![14.0, 22.0]);
    }

    #[test]
    fn test_block_sum_too_small() {
        assert!(matches!(
            block_sum(&[1.0, 2.0], 2, 1, 2),
            Err(ContourError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_box_average_shrinks_by_one() {
        let data = vec![
            0.0, 4.0, 8.0,
            4.0, 8.0, 12.0,
        ];
        let (out, w, h) = box_average_2x2(&data, 3, 2).unwrap();
        assert_eq!((w, h), (2, 1));
        assert_eq!(out, vec![4.0, 8.0]);
    }

    #[test]
    fn test_crop_rows() {
        let data: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let out = crop(&data, 4, &PixelRect::new(1, 2, 2, 2)).unwrap();
        assert_eq!(out, vec![9.0, 10.0, 13.0, 14.0]);
    }

    #[test]
    fn test_to_native_offsets() {
        let grid = WorkingGrid {
            data: vec![0.0; 4].into(),
            width: 2,
            height: 2,
            origin: (10, 20),
            factor: 2,
            denoised: false,
        };
        let p = grid.to_native(Point::new(1.0, 0.0));
        assert_eq!(p, Point::new(12.5, 20.5));

        let denoised = WorkingGrid { denoised: true, factor: 1, ..grid };
        assert_eq!(denoised.to_native(Point::new(0.0, 0.0)), Point::new(10.5, 20.5));
    }
}
