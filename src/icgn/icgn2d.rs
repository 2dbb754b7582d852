use super::gauss_newton::IcgnWorker;
use super::options::IcgnOptions;
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::BatchStats;
use crate::error::{DicError, PoiRejection};
use crate::gradient::GradientProvider2D;
use crate::image::ImageF32;
use crate::interp::Interpolator2D;
use crate::poi::{Deformation2D, Poi2D, PoiResult2D};
use crate::pool::WorkerPool;
use crate::shape::{ShapeFunction, Warp};
use crate::subset::SubsetGrid;
use log::debug;
use std::marker::PhantomData;
use std::time::Instant;

/// Read-only inputs of a 2D refinement, shared by all workers.
#[derive(Clone, Copy)]
pub struct Frame2D<'a> {
    pub reference: &'a ImageF32,
    /// Gradients of `reference`.
    pub gradient: &'a dyn GradientProvider2D,
    /// Prepared interpolator over the target image.
    pub target: &'a dyn Interpolator2D,
}

/// ICGN solver for 2D subsets with shape function `S`.
pub struct Icgn2D<S: ShapeFunction<N>, const N: usize> {
    radius: [usize; 2],
    options: IcgnOptions,
    pool: WorkerPool<IcgnWorker<N>>,
    shape: PhantomData<S>,
}

impl<S: ShapeFunction<N>, const N: usize> Icgn2D<S, N> {
    /// Allocate one scratch set per worker for subsets of
    /// `(2 radius_x + 1) × (2 radius_y + 1)` pixels.
    pub fn new(
        radius_x: usize,
        radius_y: usize,
        options: IcgnOptions,
        workers: usize,
    ) -> Result<Self, DicError> {
        if radius_x == 0 || radius_y == 0 {
            return Err(DicError::InvalidSubset(format!(
                "ICGN{} subset radius must be at least 1, got ({radius_x}, {radius_y})",
                S::NAME
            )));
        }
        let grid = SubsetGrid::centered_2d(radius_x, radius_y);
        let pool = WorkerPool::new(workers, |_| IcgnWorker::new(grid))?;
        Ok(Self {
            radius: [radius_x, radius_y],
            options,
            pool,
            shape: PhantomData,
        })
    }

    pub fn radius(&self) -> [usize; 2] {
        self.radius
    }

    pub fn workers(&self) -> usize {
        self.pool.len()
    }

    pub fn options(&self) -> &IcgnOptions {
        &self.options
    }

    pub fn set_iteration(&mut self, convergence: f32, max_iterations: usize) {
        self.options.convergence = convergence;
        self.options.max_iterations = max_iterations;
    }

    /// Take the stopping rules from `poi.result.convergence` and
    /// `poi.result.iteration`.
    pub fn set_iteration_from(&mut self, poi: &Poi2D) {
        self.set_iteration(poi.result.convergence, poi.result.iteration as usize);
    }

    /// Refine one POI with the scratch set of `worker`.
    ///
    /// The reference subset is centred at `floor(poi)` while the target is
    /// sampled around the exact position, so for a fractional POI `u` and
    /// `v` come back reduced by its fractional part.
    pub fn compute(
        &self,
        worker: usize,
        frame: &Frame2D<'_>,
        poi: &mut Poi2D,
    ) -> Result<(), DicError> {
        let mut ctx = self.pool.acquire(worker)?;
        self.refine(&mut ctx, frame, poi);
        Ok(())
    }

    /// Refine every POI in parallel over the worker pool.
    pub fn compute_batch(
        &self,
        frame: &Frame2D<'_>,
        pois: &mut [Poi2D],
    ) -> Result<BatchStats, DicError> {
        let start = Instant::now();
        self.pool
            .for_each(pois, |ctx, poi| self.refine(ctx, frame, poi))?;
        let stats = BatchStats::collect(
            pois.iter().map(|p| (p.is_rejected(), p.result.iteration)),
            elapsed_ms(start),
        );
        stats.log(&format!("ICGN{}", S::NAME));
        Ok(stats)
    }

    fn refine(&self, ctx: &mut IcgnWorker<N>, frame: &Frame2D<'_>, poi: &mut Poi2D) {
        if let Err(reason) = self.try_refine(ctx, frame, poi) {
            debug!(
                "ICGN{} rejected POI ({:.2}, {:.2}): {reason}",
                S::NAME,
                poi.x,
                poi.y
            );
            poi.reject();
        }
    }

    fn try_refine(
        &self,
        ctx: &mut IcgnWorker<N>,
        frame: &Frame2D<'_>,
        poi: &mut Poi2D,
    ) -> Result<(), PoiRejection> {
        if !(poi.x.is_finite() && poi.y.is_finite()) {
            return Err(PoiRejection::NonFinite);
        }
        let [rx, ry] = self.radius.map(|r| r as i64);
        let (cx, cy) = (poi.x.floor() as i64, poi.y.floor() as i64);
        if !frame
            .reference
            .contains_window(cx - rx, cy - ry, cx + rx, cy + ry)
        {
            return Err(PoiRejection::OutOfBounds);
        }

        let mut full = poi.deformation.to_array();
        let initial = Warp::<S, N>::from_deformation(&full);
        if !initial.is_finite() {
            return Err(PoiRejection::NonFinite);
        }

        let reference = frame.reference;
        let gradient = frame.gradient;
        let at = |l: [i64; 3]| ((cx + l[0]) as usize, (cy + l[1]) as usize);
        ctx.prepare_reference::<S>(
            |l| {
                let (x, y) = at(l);
                f64::from(reference.get(x, y))
            },
            |l| {
                let (x, y) = at(l);
                let [gx, gy] = gradient.gradient(x, y);
                [f64::from(gx), f64::from(gy), 0.0]
            },
            self.options.max_condition,
        )?;

        let (ox, oy) = (f64::from(poi.x), f64::from(poi.y));
        let target = frame.target;
        let refined = ctx.iterate(
            initial,
            |w| f64::from(target.sample((ox + w[0]) as f32, (oy + w[1]) as f32)),
            &self.options,
        )?;

        let (u0, v0) = (poi.deformation.u, poi.deformation.v);
        refined.warp.write_deformation(&mut full);
        poi.deformation = Deformation2D::from_array(&full);
        poi.result = PoiResult2D {
            u0,
            v0,
            zncc: refined.zncc(),
            iteration: refined.iterations,
            convergence: refined.convergence as f32,
        };
        Ok(())
    }
}
