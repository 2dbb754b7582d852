//! Dimension-independent inverse-compositional Gauss-Newton core.
//!
//! One [`IcgnWorker`] is the scratch set of one concurrent worker. Per POI the
//! solver calls [`IcgnWorker::prepare_reference`] once (reference subset,
//! steepest-descent image, Hessian inverse) and then
//! [`IcgnWorker::iterate`], which only resamples the target; the Hessian is
//! never rebuilt inside the loop.
//!
//! Subset samples are addressed by local integer coordinates relative to the
//! subset centre; the 2D and 3D front ends supply closures that translate
//! them into image lookups.
use super::options::IcgnOptions;
use crate::error::PoiRejection;
use crate::shape::{basis_weights, ShapeFunction, Warp};
use crate::subset::{zero_mean_norm, SubsetGrid};
use nalgebra::{SMatrix, SVector};

/// Outcome of a finished iteration loop.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Refined<S, const N: usize> {
    pub warp: Warp<S, N>,
    pub znssd: f64,
    pub iterations: u32,
    pub convergence: f64,
}

impl<S, const N: usize> Refined<S, N> {
    /// ZNCC equivalent of the final ZNSSD.
    pub fn zncc(&self) -> f32 {
        (1.0 - 0.5 * self.znssd) as f32
    }
}

pub(crate) struct IcgnWorker<const N: usize> {
    grid: SubsetGrid,
    ref_subset: Vec<f64>,
    tar_subset: Vec<f64>,
    error: Vec<f64>,
    /// Steepest-descent image, one row of `N` channels per subset sample.
    sd: Vec<[f64; N]>,
    hessian: SMatrix<f64, N, N>,
    inv_hessian: SMatrix<f64, N, N>,
    ref_norm: f64,
}

#[inline]
fn to_f64(local: [i64; 3]) -> [f64; 3] {
    [local[0] as f64, local[1] as f64, local[2] as f64]
}

/// Column-sum norm.
fn one_norm<const N: usize>(m: &SMatrix<f64, N, N>) -> f64 {
    m.column_iter()
        .map(|c| c.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

fn invert_hessian<const N: usize>(
    hessian: &SMatrix<f64, N, N>,
    max_condition: f64,
) -> Result<SMatrix<f64, N, N>, PoiRejection> {
    let chol = hessian.cholesky().ok_or(PoiRejection::SingularHessian)?;
    let inverse = chol.inverse();
    let condition = one_norm(hessian) * one_norm(&inverse);
    if !condition.is_finite() || condition > max_condition {
        return Err(PoiRejection::IllConditioned(condition));
    }
    Ok(inverse)
}

impl<const N: usize> IcgnWorker<N> {
    pub fn new(grid: SubsetGrid) -> Self {
        let n = grid.len();
        Self {
            grid,
            ref_subset: vec![0.0; n],
            tar_subset: vec![0.0; n],
            error: vec![0.0; n],
            sd: vec![[0.0; N]; n],
            hessian: SMatrix::zeros(),
            inv_hessian: SMatrix::zeros(),
            ref_norm: 0.0,
        }
    }

    /// Fill and normalise the reference subset, build the steepest-descent
    /// image and invert the Gauss-Newton Hessian.
    ///
    /// `intensity` and `gradient` are evaluated at local integer coordinates;
    /// gradient components beyond `S::DIM` are ignored.
    pub fn prepare_reference<S: ShapeFunction<N>>(
        &mut self,
        intensity: impl Fn([i64; 3]) -> f64,
        gradient: impl Fn([i64; 3]) -> [f64; 3],
        max_condition: f64,
    ) -> Result<(), PoiRejection> {
        let grid = self.grid;
        let ref_subset = &mut self.ref_subset;
        grid.for_each_local(|n, local| ref_subset[n] = intensity(local));
        self.ref_norm = zero_mean_norm(&mut self.ref_subset);
        if !(self.ref_norm > 0.0 && self.ref_norm.is_finite()) {
            return Err(PoiRejection::FlatReference);
        }

        let k = S::BASIS.len();
        let sd = &mut self.sd;
        let hessian = &mut self.hessian;
        hessian.fill(0.0);
        grid.for_each_local(|n, local| {
            let g = gradient(local);
            let weights = basis_weights(S::BASIS, to_f64(local));
            let row = &mut sd[n];
            for axis in 0..S::DIM {
                for m in 0..k {
                    row[axis * k + m] = g[axis] * weights[m];
                }
            }
            for i in 0..N {
                let si = row[i];
                if si == 0.0 {
                    continue;
                }
                for j in i..N {
                    hessian[(i, j)] += si * row[j];
                }
            }
        });
        for i in 0..N {
            for j in 0..i {
                self.hessian[(i, j)] = self.hessian[(j, i)];
            }
        }

        self.inv_hessian = invert_hessian(&self.hessian, max_condition)?;
        Ok(())
    }

    /// Run the Gauss-Newton loop from `initial`.
    ///
    /// `sample` receives the warped local coordinate of a subset sample and
    /// returns the target intensity at that position.
    pub fn iterate<S: ShapeFunction<N>>(
        &mut self,
        initial: Warp<S, N>,
        sample: impl Fn([f64; 3]) -> f64,
        options: &IcgnOptions,
    ) -> Result<Refined<S, N>, PoiRejection> {
        let grid = self.grid;
        let max_iterations = options.max_iterations.max(1);
        let threshold = f64::from(options.convergence);
        let ref_norm = self.ref_norm;

        let mut current = initial;
        let mut iterations = 0u32;
        let mut znssd;
        let mut convergence;
        loop {
            iterations += 1;

            let tar_subset = &mut self.tar_subset;
            grid.for_each_local(|n, local| {
                tar_subset[n] = sample(current.apply(to_f64(local)));
            });
            let tar_norm = zero_mean_norm(&mut self.tar_subset);
            if !(tar_norm > 0.0 && tar_norm.is_finite()) {
                return Err(PoiRejection::FlatTarget);
            }

            let scale = ref_norm / tar_norm;
            let mut sum_sq = 0.0;
            let mut numerator = SVector::<f64, N>::zeros();
            for (n, err) in self.error.iter_mut().enumerate() {
                let e = self.tar_subset[n] * scale - self.ref_subset[n];
                *err = e;
                sum_sq += e * e;
                let sd = &self.sd[n];
                for i in 0..N {
                    numerator[i] += sd[i] * e;
                }
            }
            znssd = sum_sq / (ref_norm * ref_norm);

            let dp = self.inv_hessian * numerator;
            let mut params = [0.0; N];
            params.copy_from_slice(dp.as_slice());
            let increment = Warp::<S, N>::from_params(params);

            current = current
                .compose_inverse(&increment)
                .ok_or(PoiRejection::SingularIncrement)?;
            if !current.is_finite() {
                return Err(PoiRejection::Diverged);
            }

            convergence = increment.convergence_norm(grid.radius);
            if convergence < threshold || iterations as usize >= max_iterations {
                break;
            }
        }

        Ok(Refined {
            warp: current,
            znssd,
            iterations,
            convergence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Affine2D;

    fn pattern(x: f64, y: f64) -> f64 {
        100.0 + 40.0 * (0.45 * x).sin() * (0.3 * y).cos() + 25.0 * (0.21 * x + 0.37 * y).sin()
    }

    fn pattern_gradient(x: f64, y: f64) -> [f64; 3] {
        let gx = 40.0 * 0.45 * (0.45 * x).cos() * (0.3 * y).cos()
            + 25.0 * 0.21 * (0.21 * x + 0.37 * y).cos();
        let gy = -40.0 * 0.3 * (0.45 * x).sin() * (0.3 * y).sin()
            + 25.0 * 0.37 * (0.21 * x + 0.37 * y).cos();
        [gx, gy, 0.0]
    }

    #[test]
    fn flat_reference_is_rejected() {
        let mut worker = IcgnWorker::<6>::new(SubsetGrid::centered_2d(4, 4));
        let res = worker.prepare_reference::<Affine2D>(|_| 7.0, |_| [0.0; 3], 1e12);
        assert_eq!(res, Err(PoiRejection::FlatReference));
    }

    #[test]
    fn gradient_free_texture_has_singular_hessian() {
        let mut worker = IcgnWorker::<6>::new(SubsetGrid::centered_2d(4, 4));
        // Texture varies only along x, so the y channels of the Hessian vanish.
        let res = worker.prepare_reference::<Affine2D>(
            |l| l[0] as f64,
            |_| [1.0, 0.0, 0.0],
            1e12,
        );
        assert!(
            matches!(
                res,
                Err(PoiRejection::SingularHessian) | Err(PoiRejection::IllConditioned(_))
            ),
            "{res:?}"
        );
    }

    #[test]
    fn recovers_translation_of_analytic_pattern() {
        let (cx, cy) = (50.0, 40.0);
        let (u, v) = (0.4, -0.3);
        let mut worker = IcgnWorker::<6>::new(SubsetGrid::centered_2d(10, 10));
        worker
            .prepare_reference::<Affine2D>(
                |l| pattern(cx + l[0] as f64, cy + l[1] as f64),
                |l| pattern_gradient(cx + l[0] as f64, cy + l[1] as f64),
                1e12,
            )
            .expect("textured subset");

        let opts = IcgnOptions::new(1e-4, 20);
        let refined = worker
            .iterate(
                Warp::<Affine2D, 6>::identity(),
                |w| pattern(cx + w[0] - u, cy + w[1] - v),
                &opts,
            )
            .expect("converges");
        let p = refined.warp.params;
        assert!((p[0] - u).abs() < 1e-3, "u={}", p[0]);
        assert!((p[3] - v).abs() < 1e-3, "v={}", p[3]);
        assert!(p[1].abs() < 1e-4 && p[5].abs() < 1e-4, "{p:?}");
        assert!(refined.zncc() > 0.999);
        assert!(refined.convergence < 1e-4);
        assert!(refined.iterations < 20);
    }
}
