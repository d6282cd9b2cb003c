use ndarray::Array3;

/// Row-major 4x4 voxel-to-world transform.
pub type Affine = [[f32; 4]; 4];

pub const IDENTITY_AFFINE: Affine = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// A stack of 8-bit slices with its spatial transform.
#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    pub data: Array3<u8>,
    pub affine: Affine,
}

impl Volume {
    pub fn new(data: Array3<u8>) -> Self {
        Self {
            data,
            affine: IDENTITY_AFFINE,
        }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }
}
