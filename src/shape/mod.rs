//! Polynomial shape functions and their warp matrices.
//!
//! A shape function maps a subset-local coordinate `x` to its deformed
//! position `x + u(x)`, where every displacement component is a Taylor
//! polynomial around the POI. Parameters are the Taylor coefficients in the
//! canonical order of [`crate::poi`]: per displacement axis, one entry per
//! monomial of [`ShapeFunction::BASIS`].
//!
//! For composition and inversion a warp is lifted to a square matrix acting on
//! the monomial vector `m(x) = [1, x, y, …, xx, xy, …]`: row `i` holds the
//! coefficients of the `i`-th monomial of the warped coordinate, truncated at
//! the shape order. Order 1 gives the homogeneous affine matrix (3×3 in 2D,
//! 4×4 in 3D); order 2 gives the 6×6 / 10×10 quadratic warp matrices.
//! Composition is a matrix product, `W1 ∘ W2 ↦ M1 · M2`.
//!
//! | shape          | dim | order | params | matrix |
//! |----------------|-----|-------|--------|--------|
//! | [`Affine2D`]    | 2   | 1     | 6      | 3×3    |
//! | [`Quadratic2D`] | 2   | 2     | 12     | 6×6    |
//! | [`Affine3D`]    | 3   | 1     | 12     | 4×4    |
//! | [`Quadratic3D`] | 3   | 2     | 30     | 10×10  |
use nalgebra::DMatrix;
use std::marker::PhantomData;

/// Exponents of a monomial `x^a · y^b · z^c`.
pub type Exponents = [u32; 3];

/// Largest basis in use (quadratic 3D).
pub(crate) const MAX_BASIS: usize = 10;

const BASIS_2D1: [Exponents; 3] = [[0, 0, 0], [1, 0, 0], [0, 1, 0]];
const BASIS_2D2: [Exponents; 6] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [2, 0, 0],
    [1, 1, 0],
    [0, 2, 0],
];
const BASIS_3D1: [Exponents; 4] = [[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1]];
const BASIS_3D2: [Exponents; 10] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [0, 0, 1],
    [2, 0, 0],
    [1, 1, 0],
    [1, 0, 1],
    [0, 2, 0],
    [0, 1, 1],
    [0, 0, 2],
];

/// A polynomial local deformation model with `N` parameters.
///
/// Implementors are zero-sized markers; `N` must equal
/// `DIM * BASIS.len()`.
pub trait ShapeFunction<const N: usize>:
    Clone + Copy + std::fmt::Debug + PartialEq + Send + Sync + 'static
{
    /// Spatial dimension (2 or 3).
    const DIM: usize;
    /// Polynomial order (1 or 2).
    const ORDER: u32;
    /// Short label used in logs.
    const NAME: &'static str;
    /// Monomials of the displacement polynomial, constant term first, then
    /// the `DIM` linear terms, then the quadratic terms.
    const BASIS: &'static [Exponents];
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Affine2D;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Quadratic2D;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Affine3D;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Quadratic3D;

impl ShapeFunction<6> for Affine2D {
    const DIM: usize = 2;
    const ORDER: u32 = 1;
    const NAME: &'static str = "2D1";
    const BASIS: &'static [Exponents] = &BASIS_2D1;
}

impl ShapeFunction<12> for Quadratic2D {
    const DIM: usize = 2;
    const ORDER: u32 = 2;
    const NAME: &'static str = "2D2";
    const BASIS: &'static [Exponents] = &BASIS_2D2;
}

impl ShapeFunction<12> for Affine3D {
    const DIM: usize = 3;
    const ORDER: u32 = 1;
    const NAME: &'static str = "3D1";
    const BASIS: &'static [Exponents] = &BASIS_3D1;
}

impl ShapeFunction<30> for Quadratic3D {
    const DIM: usize = 3;
    const ORDER: u32 = 2;
    const NAME: &'static str = "3D2";
    const BASIS: &'static [Exponents] = &BASIS_3D2;
}

#[inline]
fn factorial(n: u32) -> f64 {
    (1..=n).map(f64::from).product()
}

/// `e_x! · e_y! · e_z!`, the Taylor denominator of a monomial.
#[inline]
pub(crate) fn taylor_denominator(e: Exponents) -> f64 {
    factorial(e[0]) * factorial(e[1]) * factorial(e[2])
}

#[inline]
pub(crate) fn monomial(e: Exponents, local: [f64; 3]) -> f64 {
    local[0].powi(e[0] as i32) * local[1].powi(e[1] as i32) * local[2].powi(e[2] as i32)
}

/// Taylor-weighted basis values `m(x) / e!` at `local`, one per monomial.
///
/// These are the derivatives of the warp with respect to its parameters at
/// the identity and weight the gradient in the steepest-descent image.
pub(crate) fn basis_weights(basis: &[Exponents], local: [f64; 3]) -> [f64; MAX_BASIS] {
    let mut out = [0.0; MAX_BASIS];
    for (w, &e) in out.iter_mut().zip(basis.iter()) {
        *w = monomial(e, local) / taylor_denominator(e);
    }
    out
}

/// Product of two polynomials over `basis`, dropping terms beyond the basis.
fn truncated_product(
    basis: &[Exponents],
    lhs: &[f64; MAX_BASIS],
    rhs: &[f64; MAX_BASIS],
) -> [f64; MAX_BASIS] {
    let mut out = [0.0; MAX_BASIS];
    for (i, &a) in lhs.iter().enumerate().take(basis.len()) {
        if a == 0.0 {
            continue;
        }
        for (j, &b) in rhs.iter().enumerate().take(basis.len()) {
            if b == 0.0 {
                continue;
            }
            let e = [
                basis[i][0] + basis[j][0],
                basis[i][1] + basis[j][1],
                basis[i][2] + basis[j][2],
            ];
            if let Some(k) = basis.iter().position(|&m| m == e) {
                out[k] += a * b;
            }
        }
    }
    out
}

/// Deformation parameters of one shape function, with their warp matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Warp<S, const N: usize> {
    pub params: [f64; N],
    shape: PhantomData<S>,
}

impl<S: ShapeFunction<N>, const N: usize> Default for Warp<S, N> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<S: ShapeFunction<N>, const N: usize> Warp<S, N> {
    /// Number of monomials per displacement axis.
    #[inline]
    fn basis_len() -> usize {
        S::BASIS.len()
    }

    pub fn identity() -> Self {
        Self::from_params([0.0; N])
    }

    pub fn from_params(params: [f64; N]) -> Self {
        debug_assert_eq!(N, S::DIM * S::BASIS.len(), "parameter count of {}", S::NAME);
        Self {
            params,
            shape: PhantomData,
        }
    }

    /// Pick this shape's parameters out of a full second-order deformation
    /// array (`Deformation2D::to_array` / `Deformation3D::to_array`).
    pub fn from_deformation(full: &[f32]) -> Self {
        let k = Self::basis_len();
        let full_k = full.len() / S::DIM;
        let mut params = [0.0; N];
        for axis in 0..S::DIM {
            for m in 0..k {
                params[axis * k + m] = f64::from(full[axis * full_k + m]);
            }
        }
        Self::from_params(params)
    }

    /// Write this shape's parameters into a full deformation array, leaving
    /// the higher-order entries it does not model untouched.
    pub fn write_deformation(&self, full: &mut [f32]) {
        let k = Self::basis_len();
        let full_k = full.len() / S::DIM;
        for axis in 0..S::DIM {
            for m in 0..k {
                full[axis * full_k + m] = self.params[axis * k + m] as f32;
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        self.params.iter().all(|p| p.is_finite())
    }

    /// Polynomial coefficient of monomial `m` in displacement axis `axis`.
    #[inline]
    fn coefficient(&self, axis: usize, m: usize) -> f64 {
        self.params[axis * Self::basis_len() + m] / taylor_denominator(S::BASIS[m])
    }

    /// Deformed position of a subset-local coordinate.
    pub fn apply(&self, local: [f64; 3]) -> [f64; 3] {
        let k = Self::basis_len();
        let mut out = local;
        for (axis, value) in out.iter_mut().enumerate().take(S::DIM) {
            let mut u = 0.0;
            for m in 0..k {
                u += self.coefficient(axis, m) * monomial(S::BASIS[m], local);
            }
            *value += u;
        }
        out
    }

    /// Lifted warp matrix acting on the monomial vector.
    pub fn matrix(&self) -> DMatrix<f64> {
        let basis = S::BASIS;
        let k = basis.len();
        let mut coords = [[0.0; MAX_BASIS]; 3];
        for (axis, poly) in coords.iter_mut().enumerate().take(S::DIM) {
            for (m, c) in poly.iter_mut().enumerate().take(k) {
                *c = self.coefficient(axis, m);
            }
            poly[1 + axis] += 1.0;
        }

        let mut out = DMatrix::zeros(k, k);
        for (row, e) in basis.iter().enumerate() {
            let mut poly = [0.0; MAX_BASIS];
            poly[0] = 1.0;
            for axis in 0..S::DIM {
                for _ in 0..e[axis] {
                    poly = truncated_product(basis, &poly, &coords[axis]);
                }
            }
            for (col, &v) in poly.iter().enumerate().take(k) {
                out[(row, col)] = v;
            }
        }
        out
    }

    /// Recover the parameters from the linear-coordinate rows of a warp matrix.
    pub fn from_matrix(matrix: &DMatrix<f64>) -> Self {
        let k = Self::basis_len();
        debug_assert_eq!(matrix.nrows(), k);
        let mut params = [0.0; N];
        for axis in 0..S::DIM {
            let row = 1 + axis;
            for m in 0..k {
                let identity = if m == row { 1.0 } else { 0.0 };
                params[axis * k + m] =
                    (matrix[(row, m)] - identity) * taylor_denominator(S::BASIS[m]);
            }
        }
        Self::from_params(params)
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        Self::from_matrix(&(self.matrix() * other.matrix()))
    }

    /// Inverse warp; `None` when the warp matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix()
            .try_inverse()
            .map(|inv| Self::from_matrix(&inv))
    }

    /// Inverse-compositional update `self ∘ increment⁻¹`.
    pub fn compose_inverse(&self, increment: &Self) -> Option<Self> {
        let inv = increment.matrix().try_inverse()?;
        Some(Self::from_matrix(&(self.matrix() * inv)))
    }

    /// Size of this warp read as an increment, in displacement units.
    ///
    /// Every parameter is scaled by the displacement it produces at the
    /// subset edge, `Π r_axis^e / e!`; the result is the root of the sum of
    /// squares.
    pub fn convergence_norm(&self, radius: [usize; 3]) -> f64 {
        let k = Self::basis_len();
        let mut sum = 0.0;
        for axis in 0..S::DIM {
            for (m, &e) in S::BASIS.iter().enumerate() {
                let reach = (radius[0] as f64).powi(e[0] as i32)
                    * (radius[1] as f64).powi(e[1] as i32)
                    * (radius[2] as f64).powi(e[2] as i32)
                    / taylor_denominator(e);
                let scaled = self.params[axis * k + m] * reach;
                sum += scaled * scaled;
            }
        }
        sum.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn affine_matrix_is_homogeneous_transform() {
        let w = Warp::<Affine2D, 6>::from_params([1.5, 0.1, -0.2, -0.5, 0.05, 0.02]);
        let m = w.matrix();
        assert_eq!(m.nrows(), 3);
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(1, 0)], 1.5);
        assert!(close(m[(1, 1)], 1.1, 1e-15));
        assert!(close(m[(2, 2)], 1.02, 1e-15));
        let back = Warp::<Affine2D, 6>::from_matrix(&m);
        for (a, b) in back.params.iter().zip(w.params.iter()) {
            assert!(close(*a, *b, 1e-14), "{a} vs {b}");
        }
    }

    #[test]
    fn quadratic_warp_applies_taylor_coefficients() {
        let mut p = [0.0; 12];
        p[0] = 0.5;
        p[3] = 0.02; // uxx
        p[10] = -0.01; // vxy
        let w = Warp::<Quadratic2D, 12>::from_params(p);
        let out = w.apply([2.0, 3.0, 0.0]);
        assert!(close(out[0], 2.0 + 0.5 + 0.5 * 0.02 * 4.0, 1e-12));
        assert!(close(out[1], 3.0 - 0.01 * 6.0, 1e-12));
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn quadratic_matrix_round_trips_parameters() {
        let mut p = [0.0; 12];
        for (i, v) in p.iter_mut().enumerate() {
            *v = 0.01 * (i as f64 - 5.0);
        }
        let w = Warp::<Quadratic2D, 12>::from_params(p);
        let back = Warp::<Quadratic2D, 12>::from_matrix(&w.matrix());
        for (a, b) in back.params.iter().zip(p.iter()) {
            assert!(close(*a, *b, 1e-14), "{a} vs {b}");
        }
    }

    #[test]
    fn composing_with_own_inverse_gives_identity() {
        let mut p = [0.0; 30];
        for (i, v) in p.iter_mut().enumerate() {
            *v = 0.003 * ((i * 7) % 11) as f64 - 0.015;
        }
        let w = Warp::<Quadratic3D, 30>::from_params(p);
        let id = w.compose_inverse(&w).expect("invertible warp");
        assert!(id.params.iter().all(|v| v.abs() < 1e-12), "{:?}", id.params);

        let a = Warp::<Affine3D, 12>::from_params([
            0.3, 0.01, 0.02, -0.01, -1.2, 0.0, 0.03, 0.01, 2.0, -0.02, 0.0, 0.04,
        ]);
        let inv = a.inverse().expect("invertible");
        let id = a.compose(&inv);
        assert!(id.params.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn affine_composition_matches_point_mapping() {
        let a = Warp::<Affine2D, 6>::from_params([1.0, 0.1, 0.0, -2.0, 0.05, -0.1]);
        let b = Warp::<Affine2D, 6>::from_params([-0.5, 0.0, 0.2, 0.3, -0.02, 0.04]);
        let ab = a.compose(&b);
        let x = [3.0, -4.0, 0.0];
        let direct = a.apply(b.apply(x));
        let composed = ab.apply(x);
        assert!(close(direct[0], composed[0], 1e-12));
        assert!(close(direct[1], composed[1], 1e-12));
    }

    #[test]
    fn composition_is_not_additive() {
        let a = Warp::<Affine2D, 6>::from_params([1.0, 0.2, 0.0, 0.0, 0.0, 0.0]);
        let b = Warp::<Affine2D, 6>::from_params([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let ab = a.compose(&b);
        // x -> (x + 1) -> 1.2 (x + 1) + 1
        assert!(close(ab.params[0], 2.2, 1e-12));
        assert!(close(ab.params[1], 0.2, 1e-12));
    }

    #[test]
    fn convergence_norm_scales_by_subset_reach() {
        let mut p = [0.0; 12];
        p[0] = 0.3; // u
        p[1] = 0.01; // ux, reach rx
        p[3] = 0.002; // uxx, reach rx^2 / 2
        p[10] = 0.001; // vxy, reach rx * ry
        let w = Warp::<Quadratic2D, 12>::from_params(p);
        let (rx, ry) = (10.0f64, 5.0f64);
        let expected = (0.3f64.powi(2)
            + (0.01 * rx).powi(2)
            + (0.002 * rx * rx / 2.0).powi(2)
            + (0.001 * rx * ry).powi(2))
        .sqrt();
        assert!(close(w.convergence_norm([10, 5, 0]), expected, 1e-12));
    }

    #[test]
    fn deformation_mapping_skips_unmodelled_terms() {
        let full: [f32; 12] = [1.0, 0.1, 0.2, 9.0, 9.0, 9.0, -1.0, 0.3, 0.4, 9.0, 9.0, 9.0];
        let w = Warp::<Affine2D, 6>::from_deformation(&full);
        assert_eq!(w.params, [1.0, 0.1f32 as f64, 0.2f32 as f64, -1.0, 0.3f32 as f64, 0.4f32 as f64]);

        let mut out = [9.0f32; 30];
        let w3 = Warp::<Affine3D, 12>::from_params([
            1.0, 0.0, 0.0, 0.5, 2.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.25, 0.0,
        ]);
        w3.write_deformation(&mut out);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[3], 0.5);
        assert_eq!(out[4], 9.0);
        assert_eq!(out[10], 2.0);
        assert_eq!(out[20], 3.0);
        assert_eq!(out[22], 0.25);
    }

    #[test]
    fn basis_weights_follow_taylor_denominators() {
        let w = basis_weights(&BASIS_2D2, [2.0, -3.0, 0.0]);
        assert_eq!(&w[..6], &[1.0, 2.0, -3.0, 2.0, -6.0, 4.5]);
    }
}
