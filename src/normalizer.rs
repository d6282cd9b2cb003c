use crate::interpolator::Interpolator;

use ndarray::{Array3, ArrayView3, Zip};
use thiserror::Error;

const INTENSITY_MIN: f32 = 0.0;
const INTENSITY_MAX: f32 = 255.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("cannot resample an empty volume of shape {0:?}")]
    EmptyVolume((usize, usize, usize)),
}

/// Turns an assembled volume into the model's input tensor: intensities
/// clamped to [0, 255] and mapped to [0, 1], then every axis zoomed to the
/// target shape with linear interpolation.
pub struct VolumeNormalizer {
    target: [usize; 3],
}

impl VolumeNormalizer {
    pub fn new(target: [usize; 3]) -> Self {
        Self { target }
    }

    pub fn target_shape(&self) -> (usize, usize, usize) {
        (self.target[0], self.target[1], self.target[2])
    }

    pub fn normalize<A>(&self, data: ArrayView3<'_, A>) -> Result<Array3<f32>, NormalizeError>
    where
        A: Copy + Into<f32>,
    {
        let scaled = Self::clamp_and_scale(data);
        self.zoom(scaled.view())
    }

    /// Pin values to [0, 255] and divide by 255. NaN becomes 0.
    pub fn clamp_and_scale<A>(data: ArrayView3<'_, A>) -> Array3<f32>
    where
        A: Copy + Into<f32>,
    {
        let range = INTENSITY_MAX - INTENSITY_MIN;
        data.mapv(|v| {
            let v: f32 = v.into();
            if v.is_nan() {
                return 0.0;
            }
            (v.clamp(INTENSITY_MIN, INTENSITY_MAX) - INTENSITY_MIN) / range
        })
    }

    /// Order-1 zoom of each axis by `target / current`.
    pub fn zoom(&self, data: ArrayView3<'_, f32>) -> Result<Array3<f32>, NormalizeError> {
        let (depth, height, width) = data.dim();
        if depth == 0 || height == 0 || width == 0 {
            return Err(NormalizeError::EmptyVolume(data.dim()));
        }

        let (out_depth, out_height, out_width) = self.target_shape();
        let mut output = Array3::<f32>::zeros((out_depth, out_height, out_width));

        Zip::indexed(&mut output).par_for_each(|(z, y, x), voxel| {
            let src_z = Interpolator::zoom_coordinate(z, depth, out_depth);
            let src_y = Interpolator::zoom_coordinate(y, height, out_height);
            let src_x = Interpolator::zoom_coordinate(x, width, out_width);
            *voxel = Interpolator::trilinear_interpolate(&data, src_z, src_y, src_x);
        });

        Ok(output)
    }
}

impl Default for VolumeNormalizer {
    fn default() -> Self {
        Self::new([64, 64, 64])
    }
}
