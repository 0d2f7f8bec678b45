//! HRV metrics
//!
//! Time-domain HRV over an NN-interval series.

use serde::{Deserialize, Serialize};

/// Minimum NN intervals needed for non-trivial metrics
pub const MIN_NN_INTERVALS: usize = 3;

/// Successive-difference threshold for pNN50 (ms)
pub const NN50_THRESHOLD_MS: f64 = 50.0;

/// Time-domain HRV metrics for one NN series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HrvMetrics {
    /// Root mean square of successive differences (ms)
    pub rmssd: f64,
    /// Percentage of successive differences above 50 ms (0-100)
    pub pnn50: f64,
}

impl HrvMetrics {
    pub fn from_nn(nn_ms: &[f64]) -> Self {
        let (rmssd, pnn50) = compute_rmssd_and_pnn50(nn_ms);
        HrvMetrics { rmssd, pnn50 }
    }
}

/// Compute RMSSD and pNN50. Fewer than three intervals yields `(0.0, 0.0)`.
pub fn compute_rmssd_and_pnn50(nn_ms: &[f64]) -> (f64, f64) {
    if nn_ms.len() < MIN_NN_INTERVALS {
        return (0.0, 0.0);
    }

    let diffs: Vec<f64> = nn_ms.windows(2).map(|w| w[1] - w[0]).collect();
    let n = diffs.len() as f64;

    let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / n).sqrt();
    let nn50 = diffs.iter().filter(|d| d.abs() > NN50_THRESHOLD_MS).count();
    let pnn50 = nn50 as f64 * 100.0 / n;

    (rmssd, pnn50)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short_is_zero() {
        assert_eq!(compute_rmssd_and_pnn50(&[]), (0.0, 0.0));
        assert_eq!(compute_rmssd_and_pnn50(&[800.0]), (0.0, 0.0));
        assert_eq!(compute_rmssd_and_pnn50(&[800.0, 1200.0]), (0.0, 0.0));
    }

    #[test]
    fn test_constant_series() {
        assert_eq!(compute_rmssd_and_pnn50(&[800.0; 5]), (0.0, 0.0));
    }

    #[test]
    fn test_known_values() {
        // diffs: +60, -20, +40, -80
        let nn = [800.0, 860.0, 840.0, 880.0, 800.0];
        let (rmssd, pnn50) = compute_rmssd_and_pnn50(&nn);

        let expected = ((3600.0 + 400.0 + 1600.0 + 6400.0) / 4.0_f64).sqrt();
        assert!((rmssd - expected).abs() < 1e-9);
        // |60| and |80| exceed 50
        assert!((pnn50 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_exactly_fifty_not_counted() {
        let (_, pnn50) = compute_rmssd_and_pnn50(&[800.0, 850.0, 900.0]);
        assert_eq!(pnn50, 0.0);
    }

    #[test]
    fn test_metrics_struct() {
        let metrics = HrvMetrics::from_nn(&[800.0, 900.0, 800.0]);
        assert!((metrics.rmssd - 100.0).abs() < 1e-9);
        assert!((metrics.pnn50 - 100.0).abs() < 1e-9);
    }
}
