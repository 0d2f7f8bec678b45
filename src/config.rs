//! Engine configuration
//!
//! Construction parameters for [`StressEngine`](crate::engine::StressEngine).
//! Defaults reproduce the deployed thresholds; a JSON file can override any field.

use crate::classifier::LogisticModel;
use crate::error::ComputeError;
use crate::signal::{DEFAULT_PEAK_MIN_DISTANCE, DEFAULT_PEAK_MIN_HEIGHT};
use serde::{Deserialize, Serialize};

/// HRV points per second used to size the baseline
pub const DEFAULT_BASELINE_FREQUENCY_HZ: u32 = 12;

/// Heart rate must exceed the reference by this factor
pub const HEART_RATE_THRESHOLD_RATIO: f64 = 1.05;

/// RMSSD times this factor must fall below the reference
pub const RMSSD_THRESHOLD_RATIO: f64 = 1.09;

/// pNN50 times this factor must fall below the reference
pub const PNN50_THRESHOLD_RATIO: f64 = 1.09;

/// Valid heart-rate range (bpm, inclusive)
pub const MIN_HEART_RATE_BPM: f64 = 30.0;
pub const MAX_HEART_RATE_BPM: f64 = 220.0;

/// Baseline duration the window is sized for (seconds)
pub const BASELINE_SECONDS: u32 = 10 * 60;

/// Default PPG sampling rate (Hz) when the caller does not supply one
pub const DEFAULT_PPG_SAMPLING_HZ: u32 = 130;

/// Number of HRV points in a baseline of ~10 minutes
pub fn baseline_row_count_for_frequency(freq_hz: u32) -> usize {
    if freq_hz == 0 {
        return 0;
    }
    (BASELINE_SECONDS / freq_hz) as usize
}

/// True if a heart-rate value lies in the accepted range
pub fn is_valid_heart_rate(hr: f64) -> bool {
    (MIN_HEART_RATE_BPM..=MAX_HEART_RATE_BPM).contains(&hr)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub freq_hz: u32,
    pub hr_ratio: f64,
    pub rmssd_ratio: f64,
    pub pnn50_ratio: f64,
    pub peak_min_distance: usize,
    pub peak_min_height: f64,
    pub model: LogisticModel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            freq_hz: DEFAULT_BASELINE_FREQUENCY_HZ,
            hr_ratio: HEART_RATE_THRESHOLD_RATIO,
            rmssd_ratio: RMSSD_THRESHOLD_RATIO,
            pnn50_ratio: PNN50_THRESHOLD_RATIO,
            peak_min_distance: DEFAULT_PEAK_MIN_DISTANCE,
            peak_min_height: DEFAULT_PEAK_MIN_HEIGHT,
            model: LogisticModel::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_frequency(freq_hz: u32) -> Self {
        Self {
            freq_hz,
            ..Default::default()
        }
    }

    /// Capacity of both the baseline and the sliding window
    pub fn baseline_rows(&self) -> usize {
        baseline_row_count_for_frequency(self.freq_hz)
    }

    /// Reject configurations that would give empty windows or meaningless thresholds
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.freq_hz == 0 || self.freq_hz > BASELINE_SECONDS {
            return Err(ComputeError::InvalidConfig(format!(
                "freq_hz must be in 1..={BASELINE_SECONDS}, got {}",
                self.freq_hz
            )));
        }

        for (name, ratio) in [
            ("hr_ratio", self.hr_ratio),
            ("rmssd_ratio", self.rmssd_ratio),
            ("pnn50_ratio", self.pnn50_ratio),
        ] {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ComputeError::InvalidConfig(format!(
                    "{name} must be a positive finite number, got {ratio}"
                )));
            }
        }

        if !self.peak_min_height.is_finite() {
            return Err(ComputeError::InvalidConfig(
                "peak_min_height must be finite".to_string(),
            ));
        }

        if !self.model.is_valid() {
            return Err(ComputeError::InvalidConfig(format!(
                "model {} has non-finite weights",
                self.model.version
            )));
        }

        Ok(())
    }

    /// Load and validate a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }
}
