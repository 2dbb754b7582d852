//! Reference-image gradients consumed by the ICGN steepest-descent images.
//!
//! - [`GradientProvider2D`] / [`GradientProvider3D`] are the lookups the
//!   solvers depend on: per-axis derivatives at integer positions.
//! - [`Gradient2D`] / [`Gradient3D`] precompute them once with the 4th-order
//!   central difference `(-f[i+2] + 8 f[i+1] - 8 f[i-1] + f[i-2]) / 12`,
//!   dropping to the 2nd-order central difference one pixel from the border
//!   and to a one-sided difference on the border itself.
//!
//! Complexity: O(N) per axis; memory: one float buffer per axis.
use crate::image::{ImageF32, ImageView, ImageViewMut, VolumeF32};

pub trait GradientProvider2D: Sync {
    /// `[d/dx, d/dy]` at pixel (x, y).
    fn gradient(&self, x: usize, y: usize) -> [f32; 2];
}

pub trait GradientProvider3D: Sync {
    /// `[d/dx, d/dy, d/dz]` at voxel (x, y, z).
    fn gradient(&self, x: usize, y: usize, z: usize) -> [f32; 3];
}

/// Derivative of the line `f(0..len)` at `i`, reading samples via `at`.
#[inline]
fn derivative(len: usize, i: usize, at: impl Fn(usize) -> f32) -> f32 {
    if len < 2 {
        return 0.0;
    }
    if i >= 2 && i + 2 < len {
        (-at(i + 2) + 8.0 * at(i + 1) - 8.0 * at(i - 1) + at(i - 2)) / 12.0
    } else if i >= 1 && i + 1 < len {
        0.5 * (at(i + 1) - at(i - 1))
    } else if i == 0 {
        at(1) - at(0)
    } else {
        at(i) - at(i - 1)
    }
}

/// Precomputed gradients of a 2D reference image.
#[derive(Clone, Debug)]
pub struct Gradient2D {
    /// Horizontal derivative
    pub gx: ImageF32,
    /// Vertical derivative
    pub gy: ImageF32,
}

impl Gradient2D {
    pub fn new(image: &ImageF32) -> Self {
        let (w, h) = (image.w, image.h);
        let mut gx = ImageF32::new(w, h);
        let mut gy = ImageF32::new(w, h);
        for y in 0..h {
            let row = image.row(y);
            let out = gx.row_mut(y);
            for (x, value) in out.iter_mut().enumerate() {
                *value = derivative(w, x, |i| row[i]);
            }
        }
        for y in 0..h {
            let out = gy.row_mut(y);
            for (x, value) in out.iter_mut().enumerate() {
                *value = derivative(h, y, |j| image.get(x, j));
            }
        }
        Self { gx, gy }
    }
}

impl GradientProvider2D for Gradient2D {
    #[inline]
    fn gradient(&self, x: usize, y: usize) -> [f32; 2] {
        [self.gx.get(x, y), self.gy.get(x, y)]
    }
}

/// Precomputed gradients of a 3D reference volume.
#[derive(Clone, Debug)]
pub struct Gradient3D {
    pub gx: VolumeF32,
    pub gy: VolumeF32,
    pub gz: VolumeF32,
}

impl Gradient3D {
    pub fn new(volume: &VolumeF32) -> Self {
        let (dx, dy, dz) = (volume.dim_x, volume.dim_y, volume.dim_z);
        let mut gx = VolumeF32::new(dx, dy, dz);
        let mut gy = VolumeF32::new(dx, dy, dz);
        let mut gz = VolumeF32::new(dx, dy, dz);
        for z in 0..dz {
            for y in 0..dy {
                for x in 0..dx {
                    gx.set(x, y, z, derivative(dx, x, |i| volume.get(i, y, z)));
                    gy.set(x, y, z, derivative(dy, y, |j| volume.get(x, j, z)));
                    gz.set(x, y, z, derivative(dz, z, |k| volume.get(x, y, k)));
                }
            }
        }
        Self { gx, gy, gz }
    }
}

impl GradientProvider3D for Gradient3D {
    #[inline]
    fn gradient(&self, x: usize, y: usize, z: usize) -> [f32; 3] {
        [self.gx.get(x, y, z), self.gy.get(x, y, z), self.gz.get(x, y, z)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourth_order_difference_is_exact_on_cubics() {
        let img = ImageF32::from_fn(16, 8, |x, y| {
            let xf = x as f32;
            0.01 * xf * xf * xf + 2.0 * y as f32
        });
        let grad = Gradient2D::new(&img);
        let [gx, gy] = grad.gradient(8, 4);
        let expected = 0.03 * 64.0;
        assert!((gx - expected).abs() < 1e-3, "gx={gx} expected={expected}");
        assert!((gy - 2.0).abs() < 1e-4, "gy={gy}");
    }

    #[test]
    fn border_pixels_use_one_sided_differences() {
        let img = ImageF32::from_fn(5, 5, |x, _| 3.0 * x as f32);
        let grad = Gradient2D::new(&img);
        assert_eq!(grad.gradient(0, 2)[0], 3.0);
        assert_eq!(grad.gradient(4, 2)[0], 3.0);
        assert_eq!(grad.gradient(1, 2)[0], 3.0);
    }

    #[test]
    fn volume_gradient_recovers_linear_ramp() {
        let vol = VolumeF32::from_fn(8, 8, 8, |x, y, z| x as f32 - 2.0 * y as f32 + 0.5 * z as f32);
        let grad = Gradient3D::new(&vol);
        let g = grad.gradient(4, 4, 4);
        assert!((g[0] - 1.0).abs() < 1e-5);
        assert!((g[1] + 2.0).abs() < 1e-5);
        assert!((g[2] - 0.5).abs() < 1e-5);
    }
}
