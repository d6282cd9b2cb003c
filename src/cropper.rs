use crate::{
    bounding_box::{BoundingBox, BoundingBoxFold},
    rasterizer::{RASTER_EXTENSION, Raster, RasterizeError},
};

use image::{GrayImage, imageops, imageops::FilterType};
use log::{debug, info};
use rayon::prelude::*;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

const HISTOGRAM_BINS: usize = 256;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("no raster contains any foreground")]
    NoForeground,

    #[error("crop window {window:?} lies outside raster {id:?} ({width}x{height})")]
    EmptyCropWindow {
        id: String,
        window: BoundingBox,
        width: u32,
        height: u32,
    },

    #[error("cannot read raster {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Save(#[from] RasterizeError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CropReport {
    /// Global box applied to every raster; `None` when there was nothing to crop.
    pub bounding_box: Option<BoundingBox>,
    pub written: Vec<PathBuf>,
}

/// Otsu's threshold: the level maximizing between-class variance.
///
/// Pixels strictly above the returned level are foreground. An image with a
/// single intensity yields 0.
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; HISTOGRAM_BINS];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total = (image.width() as u64 * image.height() as u64) as f64;
    if total == 0.0 {
        return 0;
    }
    let mean: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64 / total)
        .sum();

    let mut best_threshold = 0;
    let mut best_variance = 0.0_f64;
    let mut background_weight = 0.0_f64;
    let mut background_mean = 0.0_f64;

    for (t, &count) in histogram.iter().enumerate() {
        let p = count as f64 / total;
        background_mean *= background_weight;
        background_weight += p;
        let foreground_weight = 1.0 - background_weight;

        if background_weight.min(foreground_weight) < f32::EPSILON as f64
            || background_weight.max(foreground_weight) > 1.0 - f32::EPSILON as f64
        {
            continue;
        }

        background_mean = (background_mean + t as f64 * p) / background_weight;
        let foreground_mean = (mean - background_weight * background_mean) / foreground_weight;
        let diff = background_mean - foreground_mean;
        let variance = background_weight * foreground_weight * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Crops a raster set to one shared foreground box and resizes every crop to
/// a fixed square.
pub struct BoundingBoxCropper {
    size: u32,
    bottom_band: u32,
}

impl BoundingBoxCropper {
    pub fn new(size: u32, bottom_band: u32) -> Self {
        Self { size, bottom_band }
    }

    /// Foreground box of a single raster after Otsu binarization, ignoring
    /// the bottom `bottom_band` rows.
    ///
    /// The Otsu level is measured on the whole raster, band included; the
    /// band is only excluded from the foreground mask afterwards.
    pub fn foreground_box(&self, image: &GrayImage) -> Option<BoundingBox> {
        let threshold = otsu_threshold(image);
        let band_start = image.height().saturating_sub(self.bottom_band);

        BoundingBox::enclosing(
            image
                .enumerate_pixels()
                .filter(|(_, y, pixel)| *y < band_start && pixel.0[0] > threshold)
                .map(|(x, y, _)| (x, y)),
        )
    }

    /// Union of the foreground boxes of every raster. Rasters without
    /// foreground contribute nothing.
    pub fn measure(&self, rasters: &[Raster]) -> Option<BoundingBox> {
        let local_boxes: Vec<Option<BoundingBox>> = rasters
            .par_iter()
            .map(|raster| {
                let local = self.foreground_box(&raster.image);
                match local {
                    Some(b) => debug!(
                        "raster {} - xmin: {}, xmax: {}, ymin: {}, ymax: {}",
                        raster.id, b.xmin, b.xmax, b.ymin, b.ymax
                    ),
                    None => debug!("raster {} has no foreground", raster.id),
                }
                local
            })
            .collect();
        local_boxes.into_iter().collect::<BoundingBoxFold>().finish()
    }

    /// Crop rows `[ymin, ymax + bottom_band)` and columns `[xmin, xmax)`,
    /// clamped to the raster, then resample to `size`x`size` with Lanczos.
    pub fn crop(&self, raster: &Raster, window: BoundingBox) -> Result<Raster, CropError> {
        let (width, height) = raster.image.dimensions();
        let x1 = window.xmax.min(width);
        let y1 = window.ymax.saturating_add(self.bottom_band).min(height);

        if window.xmin >= x1 || window.ymin >= y1 {
            return Err(CropError::EmptyCropWindow {
                id: raster.id.clone(),
                window,
                width,
                height,
            });
        }

        let cropped = imageops::crop_imm(
            &raster.image,
            window.xmin,
            window.ymin,
            x1 - window.xmin,
            y1 - window.ymin,
        )
        .to_image();
        let image = imageops::resize(&cropped, self.size, self.size, FilterType::Lanczos3);

        Ok(Raster {
            id: raster.id.clone(),
            image,
        })
    }

    /// Measure and crop a whole raster set in memory.
    pub fn crop_all(&self, rasters: &[Raster]) -> Result<(BoundingBox, Vec<Raster>), CropError> {
        let window = self.measure(rasters).ok_or(CropError::NoForeground)?;
        let cropped = rasters
            .par_iter()
            .map(|raster| self.crop(raster, window))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((window, cropped))
    }

    /// Crop every `.png` raster in `input_dir` and save the results under the
    /// same names in `output_dir`, which may be the input directory itself.
    ///
    /// An empty input directory is a no-op.
    pub fn crop_directory(
        &self,
        input_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<CropReport, CropError> {
        let rasters = load_rasters(input_dir.as_ref())?;
        if rasters.is_empty() {
            info!("no rasters found in {}", input_dir.as_ref().display());
            return Ok(CropReport::default());
        }

        let (window, cropped) = self.crop_all(&rasters)?;
        info!(
            "global bounding box over {} rasters: {:?}",
            rasters.len(),
            window
        );

        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;
        let mut written = Vec::with_capacity(cropped.len());
        for raster in &cropped {
            let path = raster.save_in(output_dir)?;
            debug!("cropped and resized raster saved at {}", path.display());
            written.push(path);
        }

        Ok(CropReport {
            bounding_box: Some(window),
            written,
        })
    }
}

/// Load every `.png` in `dir` as 8-bit grayscale, keyed by file stem, in
/// file name order.
pub fn load_rasters(dir: &Path) -> Result<Vec<Raster>, CropError> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(RASTER_EXTENSION))
        })
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| {
            let id = path.file_stem()?.to_str()?.to_string();
            Some((id, path))
        })
        .map(|(id, path)| -> Result<Raster, CropError> {
            let image = image::open(&path)
                .map_err(|source| CropError::Load {
                    path: path.clone(),
                    source,
                })?
                .to_luma8();
            Ok(Raster { id, image })
        })
        .collect()
}
