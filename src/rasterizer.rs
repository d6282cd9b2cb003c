use crate::{
    enums::DecodePolicy,
    slice_set::{SliceDecodeError, SliceSet, decode_slice},
};

use image::{GrayImage, ImageBuffer};
use log::{info, warn};
use ndarray::Array2;
use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const RASTER_EXTENSION: &str = "png";

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error(transparent)]
    Decode(#[from] SliceDecodeError),

    #[error("two slices share the identifier {0:?}")]
    DuplicateIdentifier(String),

    #[error("cannot write raster {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// An 8-bit grayscale image derived from one slice, named after it.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pub id: String,
    pub image: GrayImage,
}

impl Raster {
    pub fn file_name(&self) -> String {
        format!("{}.{RASTER_EXTENSION}", self.id)
    }

    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, RasterizeError> {
        let path = dir.join(self.file_name());
        self.image
            .save(&path)
            .map_err(|source| RasterizeError::Save {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RasterizeReport {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
    /// Distinct SeriesInstanceUIDs among the rasterized slices.
    pub series: usize,
}

/// Linearly map a slice's own minimum to 0 and maximum to 255.
///
/// A slice without intensity range (including an all-zero one) yields an
/// all-zero raster.
pub fn normalize_slice(pixels: &Array2<f32>) -> GrayImage {
    let (height, width) = pixels.dim();
    let (min, max) = pixels
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let data: Vec<u8> = if range > 0.0 && range.is_finite() {
        let scale = 255.0 / range;
        pixels
            .iter()
            .map(|&v| ((v - min) * scale).round().clamp(0.0, 255.0) as u8)
            .collect()
    } else {
        vec![0; height * width]
    };

    // Row-major iteration over (height, width) matches the image buffer layout.
    ImageBuffer::from_raw(width as u32, height as u32, data)
        .unwrap_or_else(|| GrayImage::new(width as u32, height as u32))
}

pub struct SliceRasterizer {
    policy: DecodePolicy,
}

impl SliceRasterizer {
    pub fn new(policy: DecodePolicy) -> Self {
        Self { policy }
    }

    /// Rasterize every slice of `slices` into `output_dir` as `<id>.png`.
    pub fn rasterize_set(
        &self,
        slices: &SliceSet,
        output_dir: impl AsRef<Path>,
    ) -> Result<RasterizeReport, RasterizeError> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let mut report = RasterizeReport::default();
        let mut seen_ids = HashSet::new();
        let mut series = HashSet::new();

        for slice in slices.iter() {
            if !seen_ids.insert(slice.id.clone()) {
                return Err(RasterizeError::DuplicateIdentifier(slice.id.clone()));
            }

            let decoded = match decode_slice(&slice.path) {
                Ok(decoded) => decoded,
                Err(err) => match self.policy {
                    DecodePolicy::Fail => return Err(err.into()),
                    DecodePolicy::Skip => {
                        warn!("skipping undecodable slice: {err}");
                        report.skipped += 1;
                        continue;
                    }
                },
            };
            if let Some(uid) = decoded.series_uid.clone() {
                series.insert(uid);
            }

            let raster = Raster {
                id: slice.id.clone(),
                image: normalize_slice(&decoded.pixels),
            };
            let path = raster.save_in(output_dir)?;
            info!("rasterized {} -> {}", slice.path.display(), path.display());
            report.written.push(path);
        }

        report.series = series.len();
        if report.series > 1 {
            warn!(
                "slices span {} series; only single-series archives are supported",
                series.len()
            );
        }

        Ok(report)
    }
}
