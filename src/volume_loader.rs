use crate::{
    cropper::{CropError, load_rasters},
    rasterizer::Raster,
    slice_key::{SliceKeyError, sort_by_slice_key},
    volume::Volume,
};

use log::info;
use ndarray::{Array3, ArrayView2, ShapeError, s};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No rasters found")]
    NoRasters,

    #[error("Inconsistent raster dimensions: {id:?} is {found:?}, expected {expected:?}")]
    InconsistentDimensions {
        id: String,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("raster buffer does not match its dimensions: {0}")]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Ordering(#[from] SliceKeyError),

    #[error(transparent)]
    Load(#[from] CropError),
}

/// Stacks equally sized rasters into a volume, ordered by the number embedded
/// in each raster's identifier.
pub struct VolumeAssembler;

impl VolumeAssembler {
    /// Assemble a volume from rasters in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no rasters, an identifier has no digits,
    /// or the rasters differ in size.
    pub fn assemble(mut rasters: Vec<Raster>) -> Result<Volume, VolumeLoaderError> {
        if rasters.is_empty() {
            return Err(VolumeLoaderError::NoRasters);
        }

        sort_by_slice_key(&mut rasters, |raster| raster.id.as_str())?;
        Self::validate_dimensions(&rasters)?;

        Ok(Volume::new(Self::build_volume_array(&rasters)?))
    }

    /// Assemble a volume from the `.png` rasters in a directory
    pub fn load_from_directory(path: impl AsRef<Path>) -> Result<Volume, VolumeLoaderError> {
        let rasters = load_rasters(path.as_ref())?;
        let volume = Self::assemble(rasters)?;
        info!(
            "assembled volume {:?} from {}",
            volume.dim(),
            path.as_ref().display()
        );
        Ok(volume)
    }

    fn validate_dimensions(rasters: &[Raster]) -> Result<(), VolumeLoaderError> {
        let expected = rasters[0].image.dimensions();
        match rasters
            .iter()
            .find(|raster| raster.image.dimensions() != expected)
        {
            Some(raster) => Err(VolumeLoaderError::InconsistentDimensions {
                id: raster.id.clone(),
                expected,
                found: raster.image.dimensions(),
            }),
            None => Ok(()),
        }
    }

    fn build_volume_array(rasters: &[Raster]) -> Result<Array3<u8>, VolumeLoaderError> {
        let (width, height) = rasters[0].image.dimensions();
        let (height, width) = (height as usize, width as usize);
        let depth = rasters.len();
        let mut volume = Array3::<u8>::zeros((depth, height, width));

        for (i, raster) in rasters.iter().enumerate() {
            let pixels = raster.image.as_raw().as_slice();
            let plane = ArrayView2::from_shape((height, width), pixels)?;
            volume.slice_mut(s![i, .., ..]).assign(&plane);
        }

        Ok(volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn raster(id: &str, value: u8, width: u32, height: u32) -> Raster {
        Raster {
            id: id.to_string(),
            image: GrayImage::from_pixel(width, height, Luma([value])),
        }
    }

    #[test]
    fn stacks_in_numeric_order() {
        let rasters = vec![
            raster("slice2", 2, 4, 3),
            raster("slice10", 10, 4, 3),
            raster("slice1", 1, 4, 3),
        ];
        let volume = VolumeAssembler::assemble(rasters).unwrap();
        assert_eq!(volume.dim(), (3, 3, 4));
        let order: Vec<u8> = (0..3).map(|i| volume.data[[i, 0, 0]]).collect();
        assert_eq!(order, vec![1, 2, 10]);
    }

    #[test]
    fn preserves_in_plane_layout() {
        let mut image = GrayImage::new(3, 2);
        image.put_pixel(2, 1, Luma([77]));
        let rasters = vec![Raster {
            id: "1".to_string(),
            image,
        }];
        let volume = VolumeAssembler::assemble(rasters).unwrap();
        assert_eq!(volume.dim(), (1, 2, 3));
        assert_eq!(volume.data[[0, 1, 2]], 77);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let rasters = vec![raster("1", 0, 4, 4), raster("2", 0, 4, 5)];
        assert!(matches!(
            VolumeAssembler::assemble(rasters),
            Err(VolumeLoaderError::InconsistentDimensions { .. })
        ));
    }

    #[test]
    fn short_raster_buffer_is_an_error_not_a_zero_plane() {
        let rasters = vec![raster("1", 3, 4, 3), raster("2", 3, 2, 2)];
        assert!(matches!(
            VolumeAssembler::build_volume_array(&rasters),
            Err(VolumeLoaderError::Shape(_))
        ));
    }

    #[test]
    fn identifier_without_digits_is_rejected() {
        let rasters = vec![raster("1", 0, 2, 2), raster("scout", 0, 2, 2)];
        assert!(matches!(
            VolumeAssembler::assemble(rasters),
            Err(VolumeLoaderError::Ordering(_))
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            VolumeAssembler::assemble(Vec::new()),
            Err(VolumeLoaderError::NoRasters)
        ));
    }
}
