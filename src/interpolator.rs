use ndarray::ArrayView3;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Source coordinate of output index `i` when an axis of `in_len` samples
    /// is zoomed to `out_len` samples, with the first and last samples of both
    /// grids aligned.
    #[inline]
    pub(crate) fn zoom_coordinate(i: usize, in_len: usize, out_len: usize) -> f32 {
        if out_len <= 1 || in_len <= 1 {
            return 0.0;
        }
        i as f32 * (in_len - 1) as f32 / (out_len - 1) as f32
    }

    #[inline]
    pub(crate) fn trilinear_interpolate(volume: &ArrayView3<f32>, z: f32, y: f32, x: f32) -> f32 {
        let (depth, height, width) = volume.dim();

        let z0 = (z.floor() as usize).min(depth - 1);
        let y0 = (y.floor() as usize).min(height - 1);
        let x0 = (x.floor() as usize).min(width - 1);
        let z1 = (z0 + 1).min(depth - 1);
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dz = z - z0 as f32;
        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;
        let one_minus_dz = 1.0 - dz;

        let lerp_x = |zi: usize, yi: usize| {
            let v0 = volume[[zi, yi, x0]];
            let v1 = volume[[zi, yi, x1]];
            v0.mul_add(one_minus_dx, v1 * dx)
        };

        let c0 = lerp_x(z0, y0).mul_add(one_minus_dy, lerp_x(z0, y1) * dy);
        let c1 = lerp_x(z1, y0).mul_add(one_minus_dy, lerp_x(z1, y1) * dy);

        c0.mul_add(one_minus_dz, c1 * dz)
    }
}
