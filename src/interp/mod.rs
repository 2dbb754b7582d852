//! Sub-pixel sampling of the target image/volume.
//!
//! The ICGN solvers never read the target grid directly; every warped sample
//! goes through an [`Interpolator2D`] / [`Interpolator3D`]. An interpolator is
//! prepared once per target, then shared read-only by all workers.
//!
//! The implementations here pad the source by replicating its border in
//! `prepare()`, so samples within a couple of pixels outside the grid stay
//! well defined; anything further out is clamped to the padded border.

mod planar;
mod volumetric;

pub use planar::{BicubicInterpolator, BilinearInterpolator};
pub use volumetric::{TricubicInterpolator, TrilinearInterpolator};

/// Border width added by `prepare()`; covers the 4-tap cubic support.
pub(crate) const PAD: usize = 2;

pub trait Interpolator2D: Sync {
    /// Build the lookup structures. Must run before the first `sample`.
    fn prepare(&mut self);
    /// Intensity at the real-valued position (x, y).
    fn sample(&self, x: f32, y: f32) -> f32;
}

pub trait Interpolator3D: Sync {
    fn prepare(&mut self);
    fn sample(&self, x: f32, y: f32, z: f32) -> f32;
}

/// Keys cubic-convolution parameter.
const KEYS_A: f32 = -0.5;

/// Keys weights for the taps at offsets -1, 0, 1, 2 around `floor(x)`,
/// `t` being the fractional part.
#[inline]
pub(crate) fn cubic_weights(t: f32) -> [f32; 4] {
    let a = KEYS_A;
    let near = |s: f32| ((a + 2.0) * s - (a + 3.0)) * s * s + 1.0;
    let far = |s: f32| ((a * s - 5.0 * a) * s + 8.0 * a) * s - 4.0 * a;
    [far(1.0 + t), near(t), near(1.0 - t), far(2.0 - t)]
}

/// Split a coordinate into a clamped integer base and fractional part.
///
/// `len` is the padded extent; `taps_before` / `taps_after` is the support
/// of the kernel around the base sample.
#[inline]
pub(crate) fn split_coordinate(v: f32, len: usize, taps_before: usize, taps_after: usize) -> (usize, f32) {
    let shifted = if v.is_finite() { v + PAD as f32 } else { 0.0 };
    let lo = taps_before as f32;
    let hi = (len.saturating_sub(taps_after + 1)) as f32;
    if shifted <= lo {
        return (taps_before, 0.0);
    }
    if shifted >= hi {
        return (hi as usize, 0.0);
    }
    let base = shifted.floor();
    (base as usize, shifted - base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_weights_partition_unity() {
        for &t in &[0.0f32, 0.1, 0.5, 0.77, 0.999] {
            let w = cubic_weights(t);
            let sum: f32 = w.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "t={t} sum={sum}");
        }
        let w0 = cubic_weights(0.0);
        assert!((w0[1] - 1.0).abs() < 1e-6);
        assert!(w0[0].abs() < 1e-6 && w0[2].abs() < 1e-6 && w0[3].abs() < 1e-6);
    }
}
