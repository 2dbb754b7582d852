use thiserror::Error;

/// Configuration errors raised by the correlation engines.
///
/// Per-POI failures are never reported here; they are recorded on the POI
/// itself (`zncc = -1`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DicError {
    #[error("worker id {worker} out of range (pool holds {workers} workers)")]
    WorkerOutOfRange { worker: usize, workers: usize },

    #[error("worker pool must hold at least one worker")]
    NoWorkers,

    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(String),

    #[error("invalid subset: {0}")]
    InvalidSubset(String),
}

/// Why a single POI was marked unusable (`zncc = -1`).
///
/// Never returned from the public API; used for per-POI debug logging.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum PoiRejection {
    #[error("subset window leaves the image")]
    OutOfBounds,

    #[error("position or initial guess is not finite")]
    NonFinite,

    #[error("reference subset has no intensity variation")]
    FlatReference,

    #[error("target subset has no intensity variation")]
    FlatTarget,

    #[error("Hessian is not positive definite")]
    SingularHessian,

    #[error("Hessian condition number {0:.3e} above limit")]
    IllConditioned(f64),

    #[error("warp increment is not invertible")]
    SingularIncrement,

    #[error("deformation diverged")]
    Diverged,
}
