use serde::{Deserialize, Serialize};

/// Stopping rules shared by all ICGN variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcgnOptions {
    /// Iteration stops once the weighted increment norm falls below this.
    pub convergence: f32,
    /// Hard cap on Gauss-Newton iterations per POI.
    pub max_iterations: usize,
    /// Largest accepted 1-norm condition number of the subset Hessian.
    pub max_condition: f64,
}

impl Default for IcgnOptions {
    fn default() -> Self {
        Self {
            convergence: 0.001,
            max_iterations: 10,
            max_condition: 1e12,
        }
    }
}

impl IcgnOptions {
    pub fn new(convergence: f32, max_iterations: usize) -> Self {
        Self {
            convergence,
            max_iterations,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let opts: IcgnOptions = serde_json::from_str(r#"{ "max_iterations": 25 }"#).expect("json");
        assert_eq!(opts.max_iterations, 25);
        assert_eq!(opts.convergence, 0.001);
        assert_eq!(opts.max_condition, 1e12);
    }
}
