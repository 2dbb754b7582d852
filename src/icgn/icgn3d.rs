use super::gauss_newton::IcgnWorker;
use super::options::IcgnOptions;
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::BatchStats;
use crate::error::{DicError, PoiRejection};
use crate::gradient::GradientProvider3D;
use crate::image::VolumeF32;
use crate::interp::Interpolator3D;
use crate::poi::{Deformation3D, Poi3D, PoiResult3D};
use crate::pool::WorkerPool;
use crate::shape::{ShapeFunction, Warp};
use crate::subset::SubsetGrid;
use log::debug;
use std::marker::PhantomData;
use std::time::Instant;

/// Read-only inputs of a volumetric refinement, shared by all workers.
#[derive(Clone, Copy)]
pub struct Frame3D<'a> {
    pub reference: &'a VolumeF32,
    pub gradient: &'a dyn GradientProvider3D,
    pub target: &'a dyn Interpolator3D,
}

/// ICGN solver for volumetric subsets with shape function `S`.
pub struct Icgn3D<S: ShapeFunction<N>, const N: usize> {
    radius: [usize; 3],
    options: IcgnOptions,
    pool: WorkerPool<IcgnWorker<N>>,
    shape: PhantomData<S>,
}

impl<S: ShapeFunction<N>, const N: usize> Icgn3D<S, N> {
    pub fn new(radius: [usize; 3], options: IcgnOptions, workers: usize) -> Result<Self, DicError> {
        if radius.iter().any(|&r| r == 0) {
            return Err(DicError::InvalidSubset(format!(
                "ICGN{} subset radius must be at least 1 on every axis, got {radius:?}",
                S::NAME
            )));
        }
        let grid = SubsetGrid::centered_3d(radius);
        let pool = WorkerPool::new(workers, |_| IcgnWorker::new(grid))?;
        Ok(Self {
            radius,
            options,
            pool,
            shape: PhantomData,
        })
    }

    pub fn radius(&self) -> [usize; 3] {
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
    pub fn set_iteration_from(&mut self, poi: &Poi3D) {
        self.set_iteration(poi.result.convergence, poi.result.iteration as usize);
    }

    /// Refine one POI with the scratch set of `worker`.
    ///
    /// As in 2D the reference subset is centred at `floor(poi)`, so for a
    /// fractional POI the translations come back reduced by its fractional
    /// part.
    pub fn compute(
        &self,
        worker: usize,
        frame: &Frame3D<'_>,
        poi: &mut Poi3D,
    ) -> Result<(), DicError> {
        let mut ctx = self.pool.acquire(worker)?;
        self.refine(&mut ctx, frame, poi);
        Ok(())
    }

    pub fn compute_batch(
        &self,
        frame: &Frame3D<'_>,
        pois: &mut [Poi3D],
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

    fn refine(&self, ctx: &mut IcgnWorker<N>, frame: &Frame3D<'_>, poi: &mut Poi3D) {
        if let Err(reason) = self.try_refine(ctx, frame, poi) {
            debug!(
                "ICGN{} rejected POI ({:.2}, {:.2}, {:.2}): {reason}",
                S::NAME,
                poi.x,
                poi.y,
                poi.z
            );
            poi.reject();
        }
    }

    fn try_refine(
        &self,
        ctx: &mut IcgnWorker<N>,
        frame: &Frame3D<'_>,
        poi: &mut Poi3D,
    ) -> Result<(), PoiRejection> {
        let pos = [poi.x, poi.y, poi.z];
        if !pos.iter().all(|v| v.is_finite()) {
            return Err(PoiRejection::NonFinite);
        }
        let radius = self.radius.map(|r| r as i64);
        let center = pos.map(|v| v.floor() as i64);
        let lo = [center[0] - radius[0], center[1] - radius[1], center[2] - radius[2]];
        let hi = [center[0] + radius[0], center[1] + radius[1], center[2] + radius[2]];
        if !frame.reference.contains_box(lo, hi) {
            return Err(PoiRejection::OutOfBounds);
        }

        let mut full = poi.deformation.to_array();
        let initial = Warp::<S, N>::from_deformation(&full);
        if !initial.is_finite() {
            return Err(PoiRejection::NonFinite);
        }

        let reference = frame.reference;
        let gradient = frame.gradient;
        let at = |l: [i64; 3]| {
            (
                (center[0] + l[0]) as usize,
                (center[1] + l[1]) as usize,
                (center[2] + l[2]) as usize,
            )
        };
        ctx.prepare_reference::<S>(
            |l| {
                let (x, y, z) = at(l);
                f64::from(reference.get(x, y, z))
            },
            |l| {
                let (x, y, z) = at(l);
                gradient.gradient(x, y, z).map(f64::from)
            },
            self.options.max_condition,
        )?;

        let origin = pos.map(f64::from);
        let target = frame.target;
        let refined = ctx.iterate(
            initial,
            |w| {
                f64::from(target.sample(
                    (origin[0] + w[0]) as f32,
                    (origin[1] + w[1]) as f32,
                    (origin[2] + w[2]) as f32,
                ))
            },
            &self.options,
        )?;

        let d = &poi.deformation;
        let (u0, v0, w0) = (d.u, d.v, d.w);
        refined.warp.write_deformation(&mut full);
        poi.deformation = Deformation3D::from_array(&full);
        poi.result = PoiResult3D {
            u0,
            v0,
            w0,
            zncc: refined.zncc(),
            iteration: refined.iterations,
            convergence: refined.convergence as f32,
        };
        Ok(())
    }
}
