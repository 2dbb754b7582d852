#![doc = include_str!("../README.md")]

// Data model and external-collaborator interfaces.
pub mod error;
pub mod gradient;
pub mod image;
pub mod interp;
pub mod poi;

// Correlation engines.
pub mod fftcc;
pub mod icgn;
pub mod shape;

// Plumbing shared by the engines.
pub mod config;
pub mod diagnostics;
pub mod pool;
pub mod subset;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::DicError;
pub use crate::fftcc::{Fftcc2D, Fftcc3D};
pub use crate::icgn::{Frame2D, Frame3D, Icgn2D1, Icgn2D2, Icgn3D1, Icgn3D2, IcgnOptions};
pub use crate::poi::{Poi2D, Poi3D};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use subset_dic::prelude::*;
///
/// # fn main() -> Result<(), DicError> {
/// let reference = ImageF32::new(256, 256);
/// let target = ImageF32::new(256, 256);
/// let mut pois = grid_2d(Point2D::new(40.0, 40.0), [10, 10], 16.0);
///
/// let fftcc = Fftcc2D::new(16, 16, 4)?;
/// fftcc.compute_batch(&reference, &target, &mut pois)?;
///
/// let gradient = Gradient2D::new(&reference);
/// let interp = BicubicInterpolator::prepared(&target);
/// let frame = Frame2D { reference: &reference, gradient: &gradient, target: &interp };
/// let icgn = Icgn2D1::new(16, 16, IcgnOptions::default(), 4)?;
/// let stats = icgn.compute_batch(&frame, &mut pois)?;
/// println!("valid={} mean_iter={:.2}", stats.valid, stats.mean_iterations);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::diagnostics::BatchStats;
    pub use crate::gradient::{Gradient2D, Gradient3D};
    pub use crate::image::{ImageF32, VolumeF32};
    pub use crate::interp::{BicubicInterpolator, Interpolator2D, Interpolator3D, TricubicInterpolator};
    pub use crate::poi::{grid_2d, grid_3d, Point2D, Point3D};
    pub use crate::{
        DicError, Fftcc2D, Fftcc3D, Frame2D, Frame3D, Icgn2D1, Icgn2D2, Icgn3D1, Icgn3D2,
        IcgnOptions, Poi2D, Poi3D,
    };
}
