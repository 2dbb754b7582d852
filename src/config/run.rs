use crate::icgn::IcgnOptions;
use crate::poi::{grid_2d, Poi2D, Point2D};
use crate::pool::default_worker_count;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize)]
pub struct PoiGridConfig {
    pub upper_left: [f32; 2],
    pub count: [usize; 2],
    pub spacing: f32,
}

impl PoiGridConfig {
    pub fn build(&self) -> Vec<Poi2D> {
        grid_2d(
            Point2D::new(self.upper_left[0], self.upper_left[1]),
            self.count,
            self.spacing,
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct IcgnConfig {
    /// Shape-function order, 1 (affine) or 2 (quadratic).
    pub order: u8,
    pub options: IcgnOptions,
}

impl Default for IcgnConfig {
    fn default() -> Self {
        Self {
            order: 1,
            options: IcgnOptions::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpeckleConfig {
    pub half_peak_ratio: f32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OutputConfig {
    pub json_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RunConfig {
    pub reference: PathBuf,
    pub target: PathBuf,
    pub subset_radius: [usize; 2],
    pub poi_grid: PoiGridConfig,
    #[serde(default)]
    pub icgn: IcgnConfig,
    /// Worker count; defaults to available cores minus one.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub speckle: Option<SpeckleConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl RunConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(default_worker_count).max(1)
    }
}

/// Parse and validate a run configuration from JSON text.
pub fn parse_config(contents: &str) -> Result<RunConfig, String> {
    let config: RunConfig =
        serde_json::from_str(contents).map_err(|e| format!("Failed to parse config: {e}"))?;
    if !matches!(config.icgn.order, 1 | 2) {
        return Err(format!(
            "Unsupported ICGN order {} (expected 1 or 2)",
            config.icgn.order
        ));
    }
    if config.subset_radius.contains(&0) {
        return Err("Subset radius must be positive on both axes".to_string());
    }
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<RunConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    parse_config(&contents).map_err(|e| format!("{e} ({})", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "reference": "ref.bmp",
        "target": "tar.bmp",
        "subset_radius": [16, 16],
        "poi_grid": { "upper_left": [30, 30], "count": [4, 3], "spacing": 2 }
    }"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse_config(MINIMAL).expect("valid config");
        assert_eq!(config.icgn.order, 1);
        assert_eq!(config.icgn.options, IcgnOptions::default());
        assert!(config.speckle.is_none());
        assert!(config.output.json_out.is_none());
        assert!(config.worker_count() >= 1);

        let pois = config.poi_grid.build();
        assert_eq!(pois.len(), 12);
        assert_eq!(pois[5].position(), Point2D::new(32.0, 32.0));
    }

    #[test]
    fn full_config_overrides_everything() {
        let text = r#"{
            "reference": "a.png",
            "target": "b.png",
            "subset_radius": [10, 12],
            "poi_grid": { "upper_left": [0, 0], "count": [1, 1], "spacing": 1 },
            "icgn": { "order": 2, "options": { "convergence": 0.0005, "max_iterations": 20 } },
            "workers": 3,
            "speckle": { "half_peak_ratio": 0.5 },
            "output": { "json_out": "out/result.json" }
        }"#;
        let config = parse_config(text).expect("valid config");
        assert_eq!(config.icgn.order, 2);
        assert_eq!(config.icgn.options.max_iterations, 20);
        assert_eq!(config.icgn.options.max_condition, 1e12);
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.speckle.map(|s| s.half_peak_ratio), Some(0.5));
        assert_eq!(
            config.output.json_out.as_deref(),
            Some(Path::new("out/result.json"))
        );
    }

    #[test]
    fn unsupported_order_is_rejected() {
        let text = MINIMAL.replace(
            "\"subset_radius\"",
            "\"icgn\": { \"order\": 3 }, \"subset_radius\"",
        );
        let err = parse_config(&text).expect_err("order 3");
        assert!(err.contains("order 3"), "{err}");
    }
}
