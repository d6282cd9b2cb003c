//! # DICOM volume classifier
//!
//! This crate turns an archive of DICOM slices from one scan session into a
//! normalized 3D volume and scores it with a pre-trained volumetric model.
//!
//! The reconstruction runs as a strict sequence of stages, each one finishing
//! and persisting its output before the next starts:
//!
//!  1. [`slice_filter`]: black (all-zero) slices are deleted
//!  2. [`rasterizer`]: each slice is min/max normalized into an 8-bit raster
//!  3. [`cropper`]: one Otsu-derived foreground box is computed over all
//!     rasters and applied to each, followed by a Lanczos resize to 64x64
//!  4. [`volume_loader`]: rasters are stacked in the numeric order of their
//!     identifiers and packaged as NIfTI
//!  5. [`normalizer`]: intensities are clamped to [0, 255], scaled to [0, 1]
//!     and the volume is zoomed to 64x64x64
//!  6. [`inference`]: the volume is scored by a [`inference::Classifier`]
//!
//! Every request works in its own scratch directory which is removed when
//! the request ends, whether it succeeded or not.
//!
//! Assumptions about the input:
//!  - A single series per archive
//!  - Slice identifiers (file stems) carry the slice order in their digits
//!  - Single-frame, single-channel images
//!
//! # Examples
//!
//! ## Scoring an archive
//!
//! ```no_run
//! # use dicom_volume_classifier::{config::PipelineConfig, inference::ModelError, pipeline::Pipeline};
//! # use ndarray::{Array2, ArrayView4};
//! let model = |batch: ArrayView4<'_, f32>| -> Result<Array2<f32>, ModelError> {
//!     let mean = batch.mean().unwrap_or(0.0);
//!     Ok(Array2::from_shape_vec((1, 2), vec![1.0 - mean, mean])?)
//! };
//! let pipeline = Pipeline::new(PipelineConfig::default(), "workspace", model)
//!     .expect("should have opened the workspace");
//! let prediction = pipeline
//!     .predict_archive("scan.zip")
//!     .expect("should have scored the archive");
//! println!("{:?}", prediction.scores);
//! ```

pub mod archive;
pub mod bounding_box;
pub mod config;
pub mod cropper;
pub mod enums;
pub mod inference;
mod interpolator;
pub mod nifti;
pub mod normalizer;
pub mod pipeline;
pub mod rasterizer;
pub mod slice_filter;
pub mod slice_key;
pub mod slice_set;
pub mod volume;
pub mod volume_loader;
pub mod workspace;
