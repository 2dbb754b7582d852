use super::speckle;
use super::{check_radius, peak_zncc, unwrap_peak, FftWorker};
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::BatchStats;
use crate::error::{DicError, PoiRejection};
use crate::image::ImageF32;
use crate::poi::Poi2D;
use crate::pool::WorkerPool;
use crate::subset::SubsetGrid;
use log::debug;
use rustfft::FftPlanner;
use std::time::Instant;

/// FFT-CC engine for 2D images.
pub struct Fftcc2D {
    grid: SubsetGrid,
    pool: WorkerPool<FftWorker>,
}

impl Fftcc2D {
    /// Plan transforms of `2 radius_x × 2 radius_y` samples for every worker.
    pub fn new(radius_x: usize, radius_y: usize, workers: usize) -> Result<Self, DicError> {
        check_radius(&[radius_x, radius_y])?;
        let grid = SubsetGrid::even_2d(radius_x, radius_y);
        let mut planner = FftPlanner::new();
        let pool = WorkerPool::new(workers, |_| FftWorker::new(&mut planner, &grid))?;
        Ok(Self { grid, pool })
    }

    pub fn radius(&self) -> [usize; 2] {
        [self.grid.radius[0], self.grid.radius[1]]
    }

    pub fn workers(&self) -> usize {
        self.pool.len()
    }

    /// Match one POI with the scratch set of `worker`.
    pub fn compute(
        &self,
        worker: usize,
        reference: &ImageF32,
        target: &ImageF32,
        poi: &mut Poi2D,
    ) -> Result<(), DicError> {
        let mut ctx = self.pool.acquire(worker)?;
        self.correlate_poi(&mut ctx, reference, target, poi);
        Ok(())
    }

    /// Match every POI in parallel over the worker pool.
    pub fn compute_batch(
        &self,
        reference: &ImageF32,
        target: &ImageF32,
        pois: &mut [Poi2D],
    ) -> Result<BatchStats, DicError> {
        let start = Instant::now();
        self.pool.for_each(pois, |ctx, poi| {
            self.correlate_poi(ctx, reference, target, poi)
        })?;
        let stats = BatchStats::collect(
            pois.iter().map(|p| (p.is_rejected(), 0)),
            elapsed_ms(start),
        );
        stats.log("FFT-CC 2D");
        Ok(stats)
    }

    /// Speckle size `[sx, sy]` around `poi` from the half-peak breadth of the
    /// reference autocorrelation.
    ///
    /// Returns `Ok(None)` when the window leaves the image or has no texture.
    pub fn speckle_size(
        &self,
        worker: usize,
        reference: &ImageF32,
        poi: &Poi2D,
        half_peak_ratio: f32,
    ) -> Result<Option<[f32; 2]>, DicError> {
        let mut ctx = self.pool.acquire(worker)?;
        let Some(origin) = self.window_origin(reference, poi.x, poi.y) else {
            return Ok(None);
        };
        fill_window(&self.grid, reference, origin, &mut ctx.ref_subset);
        if !speckle::autocorrelate(&mut ctx, &self.grid) {
            return Ok(None);
        }
        let threshold = f64::from(half_peak_ratio);
        Ok(Some([
            speckle::axis_size(&ctx, &self.grid, 0, threshold),
            speckle::axis_size(&ctx, &self.grid, 1, threshold),
        ]))
    }

    /// Upper-left corner of the window centred at `floor((x, y))`, if it fits.
    fn window_origin(&self, image: &ImageF32, x: f32, y: f32) -> Option<[i64; 2]> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        let [rx, ry] = self.radius().map(|r| r as i64);
        let x0 = x.floor() as i64 - rx;
        let y0 = y.floor() as i64 - ry;
        image
            .contains_window(x0, y0, x0 + 2 * rx - 1, y0 + 2 * ry - 1)
            .then_some([x0, y0])
    }

    fn correlate_poi(
        &self,
        ctx: &mut FftWorker,
        reference: &ImageF32,
        target: &ImageF32,
        poi: &mut Poi2D,
    ) {
        if let Err(reason) = self.try_correlate(ctx, reference, target, poi) {
            debug!(
                "FFT-CC rejected POI ({:.2}, {:.2}): {reason}",
                poi.x, poi.y
            );
            poi.reject();
        }
    }

    fn try_correlate(
        &self,
        ctx: &mut FftWorker,
        reference: &ImageF32,
        target: &ImageF32,
        poi: &mut Poi2D,
    ) -> Result<(), PoiRejection> {
        let (u0, v0) = (poi.deformation.u, poi.deformation.v);
        if !(u0.is_finite() && v0.is_finite() && poi.x.is_finite() && poi.y.is_finite()) {
            return Err(PoiRejection::NonFinite);
        }
        let ref_origin = self
            .window_origin(reference, poi.x, poi.y)
            .ok_or(PoiRejection::OutOfBounds)?;
        let tar_origin = self
            .window_origin(target, poi.x + u0, poi.y + v0)
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
        let [du, dv, _] = unwrap_peak(&self.grid, peak.index);

        poi.deformation.u = du as f32 + u0;
        poi.deformation.v = dv as f32 + v0;
        poi.result.u0 = u0;
        poi.result.v0 = v0;
        poi.result.zncc = zncc as f32;
        poi.result.iteration = 0;
        poi.result.convergence = 0.0;
        Ok(())
    }
}

/// Copy the window starting at `origin` into `out`, row by row.
fn fill_window(grid: &SubsetGrid, image: &ImageF32, origin: [i64; 2], out: &mut [f64]) {
    let [w, h, _] = grid.extent;
    let (x0, y0) = (origin[0] as usize, origin[1] as usize);
    for (j, dst) in out.chunks_exact_mut(w).take(h).enumerate() {
        let start = image.idx(x0, y0 + j);
        for (d, &s) in dst.iter_mut().zip(&image.data[start..start + w]) {
            *d = f64::from(s);
        }
    }
}
