//! Integer-pixel matching by FFT cross-correlation (FFT-CC).
//!
//! For every POI the zero-meaned reference and target windows are transformed,
//! multiplied as `conj(R) · T`, and transformed back. The peak of the
//! resulting circular correlation surface gives the integer displacement
//! relative to the initial guess; its height, normalised by the subset
//! energies, gives a ZNCC score in [-1, 1].
//!
//! Windows have an even extent of `2r` samples per axis; a window centred at
//! integer position `c` covers `c - r ..= c + r - 1`. The target window is
//! centred at `floor(poi + guess)`.
//!
//! The same machinery run as an autocorrelation estimates the speckle size of
//! the reference pattern ([`Fftcc2D::speckle_size`], [`Fftcc3D::speckle_size`]).

mod fftcc2d;
mod fftcc3d;
pub mod plan;
mod speckle;

pub use fftcc2d::Fftcc2D;
pub use fftcc3d::Fftcc3D;
pub use plan::CorrelationPlan;

use crate::error::DicError;
use crate::subset::{zero_mean, SubsetGrid};
use rustfft::{num_complex::Complex, FftPlanner};

/// Per-worker FFT-CC scratch: subset buffers, spectra and the transform plan.
pub struct FftWorker {
    pub(crate) ref_subset: Vec<f64>,
    pub(crate) tar_subset: Vec<f64>,
    ref_freq: Vec<Complex<f64>>,
    tar_freq: Vec<Complex<f64>>,
    /// Real part of the last inverse transform (unnormalised correlation).
    pub(crate) surface: Vec<f64>,
    /// Recentred surface used by the speckle estimator.
    pub(crate) recentred: Vec<f64>,
    plan: CorrelationPlan,
}

/// Location and height of the correlation maximum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Peak {
    pub index: usize,
    pub value: f64,
}

impl FftWorker {
    pub(crate) fn new(planner: &mut FftPlanner<f64>, grid: &SubsetGrid) -> Self {
        let n = grid.len();
        let zero = Complex::new(0.0, 0.0);
        Self {
            ref_subset: vec![0.0; n],
            tar_subset: vec![0.0; n],
            ref_freq: vec![zero; n],
            tar_freq: vec![zero; n],
            surface: vec![0.0; n],
            recentred: vec![0.0; n],
            plan: CorrelationPlan::new(planner, grid.extent),
        }
    }

    /// Zero-mean both subsets in place and return their sums of squares.
    pub(crate) fn normalise(&mut self) -> (f64, f64) {
        (zero_mean(&mut self.ref_subset), zero_mean(&mut self.tar_subset))
    }

    /// Cross-correlate the (already zero-meaned) subsets into `surface` and
    /// return the first maximum in storage order.
    pub(crate) fn correlate(&mut self) -> Peak {
        for (dst, &src) in self.ref_freq.iter_mut().zip(self.ref_subset.iter()) {
            *dst = Complex::new(src, 0.0);
        }
        for (dst, &src) in self.tar_freq.iter_mut().zip(self.tar_subset.iter()) {
            *dst = Complex::new(src, 0.0);
        }
        self.plan.forward(&mut self.ref_freq);
        self.plan.forward(&mut self.tar_freq);

        for (t, r) in self.tar_freq.iter_mut().zip(self.ref_freq.iter()) {
            *t = Complex::new(r.re * t.re + r.im * t.im, r.re * t.im - r.im * t.re);
        }
        self.plan.inverse(&mut self.tar_freq);

        let mut peak = Peak {
            index: 0,
            value: f64::NEG_INFINITY,
        };
        for (i, (dst, c)) in self.surface.iter_mut().zip(self.tar_freq.iter()).enumerate() {
            *dst = c.re;
            if c.re > peak.value {
                peak = Peak { index: i, value: c.re };
            }
        }
        peak
    }
}

/// Validate FFT-CC radii: every used axis needs a window of at least 2 samples.
pub(crate) fn check_radius(radius: &[usize]) -> Result<(), DicError> {
    if let Some(axis) = radius.iter().position(|&r| r == 0) {
        return Err(DicError::InvalidSubset(format!(
            "subset radius along axis {axis} must be at least 1"
        )));
    }
    Ok(())
}

/// Fold a raw circular peak index into a signed offset.
///
/// Indices up to the radius are positive shifts; anything beyond wraps
/// around to a negative shift.
#[inline]
pub fn unwrap_offset(index: usize, radius: usize) -> i64 {
    let index = index as i64;
    if index > radius as i64 {
        index - 2 * radius as i64
    } else {
        index
    }
}

/// Signed per-axis displacement of a flat peak index.
pub(crate) fn unwrap_peak(grid: &SubsetGrid, index: usize) -> [i64; 3] {
    let pos = grid.unravel(index);
    [
        unwrap_offset(pos[0], grid.radius[0]),
        unwrap_offset(pos[1], grid.radius[1]),
        unwrap_offset(pos[2], grid.radius[2]),
    ]
}

/// ZNCC from the raw peak height and the subset energies (sums of squares).
///
/// Returns `None` when either subset has no variance.
#[inline]
pub(crate) fn peak_zncc(peak: f64, ref_norm: f64, tar_norm: f64, len: usize) -> Option<f64> {
    let denom = (ref_norm * tar_norm).sqrt() * len as f64;
    (denom > 0.0 && denom.is_finite()).then(|| peak / denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_folds_past_the_radius() {
        let r = 8;
        assert_eq!(unwrap_offset(0, r), 0);
        assert_eq!(unwrap_offset(r - 1, r), 7);
        assert_eq!(unwrap_offset(r, r), 8);
        assert_eq!(unwrap_offset(r + 1, r), -7);
        assert_eq!(unwrap_offset(2 * r - 1, r), -1);
    }

    #[test]
    fn unwrap_peak_handles_each_axis() {
        let grid = SubsetGrid::even_3d([4, 3, 2]);
        let index = grid.flat(7, 3, 1);
        assert_eq!(unwrap_peak(&grid, index), [-1, 3, 1]);
        let index = grid.flat(4, 4, 3);
        assert_eq!(unwrap_peak(&grid, index), [4, -2, -1]);
    }

    #[test]
    fn correlating_a_subset_with_itself_peaks_at_origin() {
        let grid = SubsetGrid::even_2d(4, 4);
        let mut planner = FftPlanner::new();
        let mut worker = FftWorker::new(&mut planner, &grid);
        for (i, v) in worker.ref_subset.iter_mut().enumerate() {
            *v = ((i * 7919) % 31) as f64;
        }
        worker.tar_subset.copy_from_slice(&worker.ref_subset);
        let (rn, tn) = worker.normalise();
        let peak = worker.correlate();
        assert_eq!(peak.index, 0);
        let score = peak_zncc(peak.value, rn, tn, grid.len()).expect("textured subset");
        assert!((score - 1.0).abs() < 1e-9, "score {score}");
    }

    #[test]
    fn flat_subsets_have_no_score() {
        assert_eq!(peak_zncc(0.0, 0.0, 4.0, 16), None);
        assert!(peak_zncc(16.0, 4.0, 4.0, 16).is_some());
    }

    #[test]
    fn zero_radius_is_rejected() {
        assert!(check_radius(&[3, 0]).is_err());
        assert!(check_radius(&[1, 1, 1]).is_ok());
    }
}
