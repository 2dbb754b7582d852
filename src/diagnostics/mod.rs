//! Run diagnostics returned by the batch entry points and the demo driver.
//!
//! `BatchStats` summarises one engine pass over a POI list; `TimingBreakdown`
//! collects wall-clock stage timings for a whole run.

pub mod batch;
pub mod timing;

pub use batch::BatchStats;
pub use timing::{StageTiming, TimingBreakdown};
