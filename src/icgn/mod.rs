//! Sub-pixel refinement by inverse-compositional Gauss-Newton (ICGN).
//!
//! Each solver minimises the ZNSSD between the reference subset of a POI and
//! the target sampled through the current warp. The steepest-descent image and
//! Hessian are built once per POI from the reference gradients; every
//! iteration resamples the target, solves for an increment and updates the
//! warp as `W ← W ∘ ΔW⁻¹` through the warp matrices of [`crate::shape`].
//!
//! | solver      | shape                            | params |
//! |-------------|----------------------------------|--------|
//! | [`Icgn2D1`] | [`Affine2D`](crate::shape::Affine2D)       | 6  |
//! | [`Icgn2D2`] | [`Quadratic2D`](crate::shape::Quadratic2D) | 12 |
//! | [`Icgn3D1`] | [`Affine3D`](crate::shape::Affine3D)       | 12 |
//! | [`Icgn3D2`] | [`Quadratic3D`](crate::shape::Quadratic3D) | 30 |
//!
//! A POI is rejected (`zncc = -1`, deformation untouched) when its reference
//! subset leaves the image, its guess is not finite, its Hessian is singular
//! or ill-conditioned, or the iteration degenerates. Rejections are logged at
//! debug level and never abort a batch.

mod gauss_newton;
mod icgn2d;
mod icgn3d;
pub mod options;

pub use icgn2d::{Frame2D, Icgn2D};
pub use icgn3d::{Frame3D, Icgn3D};
pub use options::IcgnOptions;

use crate::shape::{Affine2D, Affine3D, Quadratic2D, Quadratic3D};

pub type Icgn2D1 = Icgn2D<Affine2D, 6>;
pub type Icgn2D2 = Icgn2D<Quadratic2D, 12>;
pub type Icgn3D1 = Icgn3D<Affine3D, 12>;
pub type Icgn3D2 = Icgn3D<Quadratic3D, 30>;
