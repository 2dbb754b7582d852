use super::speckle;
use super::{check_radius, peak_zncc, unwrap_peak, FftWorker};
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::BatchStats;
use crate::error::{DicError, PoiRejection};
use crate::image::VolumeF32;
use crate::poi::Poi3D;
use crate::pool::WorkerPool;
use crate::subset::SubsetGrid;
use log::debug;
use rustfft::FftPlanner;
use std::time::Instant;

/// FFT-CC engine for volumes.
pub struct Fftcc3D {
    grid: SubsetGrid,
    pool: WorkerPool<FftWorker>,
}

impl Fftcc3D {
    pub fn new(radius: [usize; 3], workers: usize) -> Result<Self, DicError> {
        check_radius(&radius)?;
        let grid = SubsetGrid::even_3d(radius);
        let mut planner = FftPlanner::new();
        let pool = WorkerPool::new(workers, |_| FftWorker::new(&mut planner, &grid))?;
        Ok(Self { grid, pool })
    }

    pub fn radius(&self) -> [usize; 3] {
        self.grid.radius
    }

    pub fn workers(&self) -> usize {
        self.pool.len()
    }

    pub fn compute(
        &self,
        worker: usize,
        reference: &VolumeF32,
        target: &VolumeF32,
        poi: &mut Poi3D,
    ) -> Result<(), DicError> {
        let mut ctx = self.pool.acquire(worker)?;
        self.correlate_poi(&mut ctx, reference, target, poi);
        Ok(())
    }

    pub fn compute_batch(
        &self,
        reference: &VolumeF32,
        target: &VolumeF32,
        pois: &mut [Poi3D],
    ) -> Result<BatchStats, DicError> {
        let start = Instant::now();
        self.pool.for_each(pois, |ctx, poi| {
            self.correlate_poi(ctx, reference, target, poi)
        })?;
        let stats = BatchStats::collect(
            pois.iter().map(|p| (p.is_rejected(), 0)),
            elapsed_ms(start),
        );
        stats.log("FFT-CC 3D");
        Ok(stats)
    }

    /// Speckle size `[sx, sy, sz]` around `poi`; see [`super::Fftcc2D::speckle_size`].
    pub fn speckle_size(
        &self,
        worker: usize,
        reference: &VolumeF32,
        poi: &Poi3D,
        half_peak_ratio: f32,
    ) -> Result<Option<[f32; 3]>, DicError> {
        let mut ctx = self.pool.acquire(worker)?;
        let Some(origin) = self.window_origin(reference, [poi.x, poi.y, poi.z]) else {
            return Ok(None);
        };
        fill_window(&self.grid, reference, origin, &mut ctx.ref_subset);
        if !speckle::autocorrelate(&mut ctx, &self.grid) {
            return Ok(None);
        }
        let threshold = f64::from(half_peak_ratio);
        Ok(Some(
            [0, 1, 2].map(|axis| speckle::axis_size(&ctx, &self.grid, axis, threshold)),
        ))
    }

    fn window_origin(&self, volume: &VolumeF32, pos: [f32; 3]) -> Option<[i64; 3]> {
        if !pos.iter().all(|v| v.is_finite()) {
            return None;
        }
        let mut lo = [0i64; 3];
        let mut hi = [0i64; 3];
        for axis in 0..3 {
            let r = self.grid.radius[axis] as i64;
            lo[axis] = pos[axis].floor() as i64 - r;
            hi[axis] = lo[axis] + 2 * r - 1;
        }
        volume.contains_box(lo, hi).then_some(lo)
    }

    fn correlate_poi(
        &self,
        ctx: &mut FftWorker,
        reference: &VolumeF32,
        target: &VolumeF32,
        poi: &mut Poi3D,
    ) {
        if let Err(reason) = self.try_correlate(ctx, reference, target, poi) {
            debug!(
                "FFT-CC rejected POI ({:.2}, {:.2}, {:.2}): {reason}",
                poi.x, poi.y, poi.z
            );
            poi.reject();
        }
    }

    fn try_correlate(
        &self,
        ctx: &mut FftWorker,
        reference: &VolumeF32,
        target: &VolumeF32,
        poi: &mut Poi3D,
    ) -> Result<(), PoiRejection> {
        let guess = [poi.deformation.u, poi.deformation.v, poi.deformation.w];
        if !guess.iter().all(|v| v.is_finite()) {
            return Err(PoiRejection::NonFinite);
        }
        let pos = [poi.x, poi.y, poi.z];
        let ref_origin = self
            .window_origin(reference, pos)
            .ok_or(PoiRejection::OutOfBounds)?;
        let moved = [pos[0] + guess[0], pos[1] + guess[1], pos[2] + guess[2]];
        let tar_origin = self
            .window_origin(target, moved)
            .ok_or(PoiRejection::OutOfBounds)?;

        fill_window(&self.grid, reference, ref_origin, &mut ctx.ref_subset);
        fill_window(&self.grid, target, tar_origin, &mut ctx.tar_subset);
        let (ref_norm, tar_norm) = ctx.normalise();
        if ref_norm <= 0.0 {
            return Err(PoiRejection::FlatReference);
        }
        let peak = ctx.correlate();
        let zncc = peak_zncc(peak.value, ref_norm, tar_norm, self.grid.len())
            .ok_or(PoiRejection::FlatTarget)?;
        let [du, dv, dw] = unwrap_peak(&self.grid, peak.index);

        poi.deformation.u = du as f32 + guess[0];
        poi.deformation.v = dv as f32 + guess[1];
        poi.deformation.w = dw as f32 + guess[2];
        poi.result.u0 = guess[0];
        poi.result.v0 = guess[1];
        poi.result.w0 = guess[2];
        poi.result.zncc = zncc as f32;
        poi.result.iteration = 0;
        poi.result.convergence = 0.0;
        Ok(())
    }
}

/// Copy the box starting at `origin` into `out`, x fastest.
fn fill_window(grid: &SubsetGrid, volume: &VolumeF32, origin: [i64; 3], out: &mut [f64]) {
    let [dx, dy, dz] = grid.extent;
    let [x0, y0, z0] = origin.map(|v| v as usize);
    let mut rows = out.chunks_exact_mut(dx);
    for k in 0..dz {
        for j in 0..dy {
            let Some(dst) = rows.next() else {
                return;
            };
            let start = volume.idx(x0, y0 + j, z0 + k);
            for (d, &s) in dst.iter_mut().zip(&volume.data[start..start + dx]) {
                *d = f64::from(s);
            }
        }
    }
}
