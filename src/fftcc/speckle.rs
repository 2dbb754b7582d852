//! Speckle-size estimation from the reference autocorrelation.
//!
//! The zero-meaned reference window is correlated with itself, normalised so
//! the zero-lag peak is 1, and re-centred so that lag 0 sits at index
//! `r - 1` on every axis. Along each axis through the peak the estimator walks
//! outwards in unit steps until the surface first drops to the threshold and
//! interpolates the crossing linearly; the speckle size is the distance
//! between the positive and the negative crossing (0 on a side without one).
use super::{unwrap_offset, FftWorker};
use crate::subset::{zero_mean, SubsetGrid};

/// Autocorrelate the reference window in `worker.ref_subset` and store the
/// normalised, re-centred surface in `worker.recentred`.
///
/// Returns `false` when the window has no texture.
pub(crate) fn autocorrelate(worker: &mut FftWorker, grid: &SubsetGrid) -> bool {
    let ref_norm = zero_mean(&mut worker.ref_subset);
    if !(ref_norm > 0.0 && ref_norm.is_finite()) {
        return false;
    }
    worker.tar_subset.copy_from_slice(&worker.ref_subset);
    worker.correlate();

    let scale = 1.0 / (ref_norm * grid.len() as f64);
    for (i, &value) in worker.surface.iter().enumerate() {
        let pos = grid.unravel(i);
        let mut shifted = [0usize; 3];
        for axis in 0..3 {
            let r = grid.radius[axis];
            if grid.extent[axis] > 1 {
                shifted[axis] = (unwrap_offset(pos[axis], r) + r as i64 - 1) as usize;
            }
        }
        let dst = grid.flat(shifted[0], shifted[1], shifted[2]);
        worker.recentred[dst] = value * scale;
    }
    true
}

/// Threshold crossing between samples `x1` (above) and `x2` (at or below).
#[inline]
fn crossing(x1: f64, z1: f64, x2: f64, z2: f64, threshold: f64) -> f64 {
    x2 - (x2 - x1) * (threshold - z2) / (z1 - z2)
}

/// Speckle size along `axis` from the surface left by [`autocorrelate`].
pub(crate) fn axis_size(worker: &FftWorker, grid: &SubsetGrid, axis: usize, threshold: f64) -> f32 {
    if grid.extent[axis] < 2 {
        return 0.0;
    }
    let mut center = [0usize; 3];
    for a in 0..3 {
        if grid.extent[a] > 1 {
            center[a] = grid.radius[a] - 1;
        }
    }
    let at = |t: usize| {
        let mut pos = center;
        pos[axis] = t;
        worker.recentred[grid.flat(pos[0], pos[1], pos[2])]
    };
    let c = center[axis];
    let last = grid.extent[axis] - 1;

    let mut forward = 0.0;
    for x1 in c..last {
        let x2 = x1 + 1;
        let (z1, z2) = (at(x1), at(x2));
        if z1 > threshold && z2 <= threshold {
            forward = crossing(x1 as f64, z1, x2 as f64, z2, threshold);
            break;
        }
    }

    let mut backward = 0.0;
    for x1 in (1..=c).rev() {
        let x2 = x1 - 1;
        let (z1, z2) = (at(x1), at(x2));
        if z1 > threshold && z2 <= threshold {
            backward = crossing(x1 as f64, z1, x2 as f64, z2, threshold);
            break;
        }
    }

    (forward - backward) as f32
}
