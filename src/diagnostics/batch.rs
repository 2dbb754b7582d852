use serde::{Deserialize, Serialize};

/// Outcome summary of one engine pass over a POI list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total: usize,
    pub valid: usize,
    pub rejected: usize,
    /// Mean iteration count over the valid POIs (0 for FFT-CC).
    pub mean_iterations: f32,
    pub elapsed_ms: f64,
}

impl BatchStats {
    /// Summarise `(rejected, iterations)` pairs, one per POI.
    pub fn collect(outcomes: impl IntoIterator<Item = (bool, u32)>, elapsed_ms: f64) -> Self {
        let mut stats = Self {
            elapsed_ms,
            ..Default::default()
        };
        let mut iterations = 0u64;
        for (rejected, iters) in outcomes {
            stats.total += 1;
            if rejected {
                stats.rejected += 1;
            } else {
                stats.valid += 1;
                iterations += u64::from(iters);
            }
        }
        if stats.valid > 0 {
            stats.mean_iterations = iterations as f32 / stats.valid as f32;
        }
        stats
    }

    /// Log the summary under `stage`; warns when any POI was rejected.
    pub(crate) fn log(&self, stage: &str) {
        if self.rejected > 0 {
            log::warn!(
                "{stage}: {} of {} POIs rejected",
                self.rejected,
                self.total
            );
        }
        log::debug!(
            "{stage}: total={} valid={} mean_iter={:.2} elapsed_ms={:.3}",
            self.total,
            self.valid,
            self.mean_iterations,
            self.elapsed_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_ignores_rejected_iterations() {
        let stats = BatchStats::collect([(false, 4), (true, 0), (false, 2)], 3.0);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.rejected, 1);
        assert!((stats.mean_iterations - 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_batch_is_all_zero() {
        let stats = BatchStats::collect(std::iter::empty(), 0.0);
        assert_eq!(stats, BatchStats::default());
    }
}
