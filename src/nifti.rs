//! NIfTI-1 storage for the packaged volume.
//!
//! Volumes are written with 8-bit voxels and the volume's affine stored as
//! the sform; a `.gz` file name selects gzip compression. Axis order is
//! (depth, height, width), so `dim[1]` is the slice count.

use crate::volume::{Affine, IDENTITY_AFFINE, Volume};

use ::nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions, writer::WriterOptions};
use ndarray::{Array3, Ix3, ShapeError};
use std::path::Path;
use thiserror::Error;

/// Largest axis length a NIfTI-1 `dim` entry can hold.
pub const MAX_AXIS_LEN: usize = i16::MAX as usize;

const NIFTI_XFORM_ALIGNED_ANAT: i16 = 2;

#[derive(Debug, Error)]
pub enum NiftiError {
    #[error("NIfTI error: {0}")]
    Format(#[from] ::nifti::NiftiError),

    #[error("volume shape {0:?} exceeds the NIfTI-1 axis limit of {MAX_AXIS_LEN}")]
    AxisTooLong((usize, usize, usize)),

    #[error("not a 3D volume: {0}")]
    Shape(#[from] ShapeError),
}

/// A volume read back from disk, with voxels scaled to `f32`.
#[derive(Clone, Debug, PartialEq)]
pub struct NiftiVolume {
    pub data: Array3<f32>,
    pub affine: Affine,
}

fn header_for(volume: &Volume) -> NiftiHeader {
    NiftiHeader {
        sform_code: NIFTI_XFORM_ALIGNED_ANAT,
        srow_x: volume.affine[0],
        srow_y: volume.affine[1],
        srow_z: volume.affine[2],
        scl_slope: 1.0,
        scl_inter: 0.0,
        cal_max: 255.0,
        ..NiftiHeader::default()
    }
}

/// Write a volume as NIfTI-1, gzip-compressed when `path` ends in `.gz`.
///
/// Fails without touching `path` when an axis does not fit the header.
pub fn write_volume(volume: &Volume, path: impl AsRef<Path>) -> Result<(), NiftiError> {
    let (depth, height, width) = volume.dim();
    if [depth, height, width].iter().any(|&len| len > MAX_AXIS_LEN) {
        return Err(NiftiError::AxisTooLong(volume.dim()));
    }

    let header = header_for(volume);
    WriterOptions::new(path.as_ref())
        .reference_header(&header)
        .write_nifti(&volume.data)?;
    Ok(())
}

/// Read a 3D NIfTI file, applying `scl_slope`/`scl_inter` to the voxels.
pub fn read_volume(path: impl AsRef<Path>) -> Result<NiftiVolume, NiftiError> {
    let obj = ReaderOptions::new().read_file(path.as_ref())?;
    let header = obj.header().clone();
    let data = obj
        .into_volume()
        .into_ndarray::<f32>()?
        .into_dimensionality::<Ix3>()?;

    let affine = if header.sform_code > 0 {
        [header.srow_x, header.srow_y, header.srow_z, [0.0, 0.0, 0.0, 1.0]]
    } else {
        IDENTITY_AFFINE
    };

    Ok(NiftiVolume { data, affine })
}
