//! Logistic-regression stress classifier
//!
//! Maps (heart rate, RMSSD, pNN50) to a stress probability with frozen,
//! pre-trained weights. No online training happens here.

use crate::types::MlLabel;
use serde::{Deserialize, Serialize};

/// Version tag of the bundled weights
pub const DEFAULT_MODEL_VERSION: &str = "lr-hr-rmssd-pnn50.v1";

/// Score at or above which a chunk is labelled `ml_stress`
pub const STRESS_SCORE_THRESHOLD: f64 = 0.7;

/// Score at or below which a chunk is labelled `ml_relaxed`
pub const RELAXED_SCORE_THRESHOLD: f64 = 0.3;

/// Logistic model weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub version: String,
    pub bias: f64,
    pub w_hr: f64,
    pub w_rmssd: f64,
    pub w_pnn50: f64,
}

impl Default for LogisticModel {
    fn default() -> Self {
        Self {
            version: DEFAULT_MODEL_VERSION.to_string(),
            bias: -44.24435565553951,
            w_hr: 0.5014126733435821,
            w_rmssd: 0.008600895019301714,
            w_pnn50: -0.03421459783035022,
        }
    }
}

impl LogisticModel {
    /// Stress probability in [0, 1], or `None` if any feature is missing
    pub fn probability(&self, hr: Option<f64>, rmssd: Option<f64>, pnn50: Option<f64>) -> Option<f64> {
        let (hr, rmssd, pnn50) = (hr?, rmssd?, pnn50?);
        let z = self.bias + self.w_hr * hr + self.w_rmssd * rmssd + self.w_pnn50 * pnn50;
        Some(1.0 / (1.0 + (-z).exp()))
    }

    pub fn is_valid(&self) -> bool {
        [self.bias, self.w_hr, self.w_rmssd, self.w_pnn50]
            .iter()
            .all(|w| w.is_finite())
    }
}

/// Stress probability using the bundled weights
pub fn ml_stress_probability(hr: Option<f64>, rmssd: Option<f64>, pnn50: Option<f64>) -> Option<f64> {
    LogisticModel::default().probability(hr, rmssd, pnn50)
}

/// Label a score; `None` passes through
pub fn ml_label_from_score(score: Option<f64>) -> Option<MlLabel> {
    let score = score?;
    Some(if score >= STRESS_SCORE_THRESHOLD {
        MlLabel::MlStress
    } else if score <= RELAXED_SCORE_THRESHOLD {
        MlLabel::MlRelaxed
    } else {
        MlLabel::MlUncertain
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_feature_is_none() {
        assert!(ml_stress_probability(None, Some(40.0), Some(10.0)).is_none());
        assert!(ml_stress_probability(Some(80.0), None, Some(10.0)).is_none());
        assert!(ml_stress_probability(Some(80.0), Some(40.0), None).is_none());
    }

    #[test]
    fn test_probability_matches_formula() {
        let model = LogisticModel::default();
        let z = model.bias + model.w_hr * 90.0 + model.w_rmssd * 30.0 + model.w_pnn50 * 5.0;
        let expected = 1.0 / (1.0 + (-z).exp());

        let p = ml_stress_probability(Some(90.0), Some(30.0), Some(5.0)).unwrap();
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn test_probability_monotone_in_hr() {
        let low = ml_stress_probability(Some(70.0), Some(50.0), Some(20.0)).unwrap();
        let high = ml_stress_probability(Some(110.0), Some(50.0), Some(20.0)).unwrap();
        assert!(low < 0.3);
        assert!(high > 0.7);
        assert!((0.0..=1.0).contains(&low));
        assert!((0.0..=1.0).contains(&high));
    }

    #[test]
    fn test_label_boundaries() {
        assert_eq!(ml_label_from_score(Some(0.3)), Some(MlLabel::MlRelaxed));
        assert_eq!(ml_label_from_score(Some(0.7)), Some(MlLabel::MlStress));
        assert_eq!(ml_label_from_score(Some(0.5)), Some(MlLabel::MlUncertain));
        assert_eq!(ml_label_from_score(Some(0.0)), Some(MlLabel::MlRelaxed));
        assert_eq!(ml_label_from_score(Some(1.0)), Some(MlLabel::MlStress));
        assert_eq!(ml_label_from_score(None), None);
    }

    #[test]
    fn test_label_total_on_unit_interval() {
        for i in 0..=1000 {
            let score = i as f64 / 1000.0;
            let label = ml_label_from_score(Some(score)).unwrap();
            let expected = if score >= 0.7 {
                MlLabel::MlStress
            } else if score <= 0.3 {
                MlLabel::MlRelaxed
            } else {
                MlLabel::MlUncertain
            };
            assert_eq!(label, expected);
        }
    }
}
