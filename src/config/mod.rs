//! JSON configuration of the demo driver.

pub mod run;

pub use run::{load_config, parse_config, RunConfig};
