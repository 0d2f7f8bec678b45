//! Stateful stress engine
//!
//! One engine per recording session. Each call to [`StressEngine::process_chunk`]
//! turns a chunk of samples into one [`StressResult`], updating the baseline and
//! sliding windows on the way. The engine performs no I/O and never fails.

use crate::classifier::ml_label_from_score;
use crate::config::{is_valid_heart_rate, EngineConfig};
use crate::error::ComputeError;
use crate::hrv::HrvMetrics;
use crate::intervals::{collect_ibi, nn_intervals_from_ppg, NnSource};
use crate::types::{
    BasicStatus, HrvPoint, Sample, SlidingStatus, StressResult, StressStatus,
};
use crate::window::{average, BaselineWindow, SlidingWindow, Thresholds};
use serde::{Deserialize, Serialize};

/// Serializable engine state (windows and counters)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EngineState {
    baseline: BaselineWindow,
    sliding: SlidingWindow,
    total_count: u64,
    last_valid_hr: Option<f64>,
}

impl EngineState {
    fn new(capacity: usize) -> Self {
        Self {
            baseline: BaselineWindow::new(capacity),
            sliding: SlidingWindow::new(capacity),
            total_count: 0,
            last_valid_hr: None,
        }
    }
}

/// Per-session HRV and stress estimation engine
#[derive(Debug, Clone)]
pub struct StressEngine {
    config: EngineConfig,
    state: EngineState,
}

impl Default for StressEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StressEngine {
    /// Create an engine with the default configuration (12 Hz, 50-row baseline)
    pub fn new() -> Self {
        Self::from_valid_config(EngineConfig::default())
    }

    /// Create an engine with a specific baseline frequency
    pub fn with_frequency(freq_hz: u32) -> Result<Self, ComputeError> {
        Self::with_config(EngineConfig::with_frequency(freq_hz))
    }

    /// Create an engine from a validated configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: EngineConfig) -> Self {
        let state = EngineState::new(config.baseline_rows());
        Self { config, state }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn baseline_rows(&self) -> usize {
        self.state.baseline.capacity()
    }

    pub fn baseline_window(&self) -> &BaselineWindow {
        &self.state.baseline
    }

    pub fn sliding_window(&self) -> &SlidingWindow {
        &self.state.sliding
    }

    /// Number of non-empty chunks processed since the last reset
    pub fn total_count(&self) -> u64 {
        self.state.total_count
    }

    pub fn last_valid_heart_rate(&self) -> Option<f64> {
        self.state.last_valid_hr
    }

    /// Return to the initial empty state. Call at the start of every session.
    pub fn reset(&mut self) {
        self.state.baseline.clear();
        self.state.sliding.clear();
        self.state.total_count = 0;
        self.state.last_valid_hr = None;
    }

    fn thresholds(&self) -> Thresholds {
        Thresholds {
            hr_ratio: self.config.hr_ratio,
            rmssd_ratio: self.config.rmssd_ratio,
            pnn50_ratio: self.config.pnn50_ratio,
        }
    }

    /// Process one chunk of samples.
    ///
    /// `sampling_hz` is the PPG sampling rate; it only matters when the chunk has
    /// no inter-beat intervals and HRV must be derived from PPG peaks.
    pub fn process_chunk(&mut self, rows: &[Sample], sampling_hz: u32) -> StressResult {
        if rows.is_empty() {
            log::debug!("empty chunk, returning degenerate result");
            return StressResult::degenerate();
        }

        let ibi = collect_ibi(rows);
        let hr_mean = self.chunk_heart_rate(rows, &ibi);
        if let Some(hr) = hr_mean {
            if is_valid_heart_rate(hr) {
                self.state.last_valid_hr = Some(hr);
            }
        }

        let ppg: Vec<f64> = rows.iter().filter_map(|r| r.ppg).collect();
        let ppg_mean = average(ppg.iter().copied());

        let nn_source = if !ibi.is_empty() {
            Some(NnSource::Ibi)
        } else if !ppg.is_empty() {
            Some(NnSource::Ppg)
        } else {
            None
        };

        let metrics = match nn_source {
            Some(NnSource::Ibi) => Some(HrvMetrics::from_nn(&ibi)),
            Some(NnSource::Ppg) => {
                let nn = nn_intervals_from_ppg(
                    &ppg,
                    sampling_hz,
                    self.config.peak_min_distance,
                    self.config.peak_min_height,
                );
                Some(HrvMetrics::from_nn(&nn))
            }
            None => None,
        };
        let rmssd = metrics.map(|m| m.rmssd);
        let pnn50 = metrics.map(|m| m.pnn50);

        let point = HrvPoint {
            hr_mean,
            rmssd,
            pnn50,
        };
        self.state.total_count += 1;

        self.state.baseline.push(point);
        self.state.sliding.push(point);

        let thresholds = self.thresholds();

        let status_basic = if self.state.baseline.is_full()
            && self
                .state
                .baseline
                .averages()
                .indicates_stress(&point, &thresholds)
        {
            BasicStatus::BasicWarning
        } else {
            BasicStatus::Success
        };

        let status_sliding = if self.state.sliding.is_full()
            && self
                .state
                .sliding
                .averages()
                .indicates_stress(&point, &thresholds)
        {
            SlidingStatus::SlidingWarning
        } else {
            SlidingStatus::Success
        };

        let status = if status_basic == BasicStatus::BasicWarning
            || status_sliding == SlidingStatus::SlidingWarning
        {
            StressStatus::Warning
        } else {
            StressStatus::Success
        };

        let ml_score = self.config.model.probability(hr_mean, rmssd, pnn50);
        let ml_label = ml_label_from_score(ml_score);

        log::debug!(
            "chunk {}: rows={} source={:?} hr={:?} rmssd={:?} pnn50={:?} basic={} sliding={}",
            self.state.total_count,
            rows.len(),
            nn_source,
            hr_mean,
            rmssd,
            pnn50,
            status_basic.as_str(),
            status_sliding.as_str(),
        );

        StressResult {
            status,
            status_basic,
            status_sliding,
            hr_mean,
            rmssd,
            pnn50,
            ppg_mean,
            ml_score,
            ml_label,
        }
    }

    /// Mean heart rate for a chunk: reported HR, else carried forward, else from IBIs
    fn chunk_heart_rate(&self, rows: &[Sample], ibi: &[f64]) -> Option<f64> {
        let reported = average(
            rows.iter()
                .filter_map(|r| r.hr)
                .filter(|&hr| is_valid_heart_rate(hr)),
        );

        let hr_mean = reported.or(self.state.last_valid_hr);
        if hr_mean.is_some() {
            return hr_mean;
        }

        average(ibi.iter().copied())
            .filter(|&mean_ibi| mean_ibi > 0.0)
            .map(|mean_ibi| 60_000.0 / mean_ibi)
            .filter(|&hr| is_valid_heart_rate(hr))
    }

    /// Save windows and counters to JSON
    pub fn save_state(&self) -> Result<String, ComputeError> {
        serde_json::to_string(&self.state).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Restore windows and counters saved by [`save_state`](Self::save_state)
    pub fn load_state(&mut self, json: &str) -> Result<(), ComputeError> {
        let state: EngineState =
            serde_json::from_str(json).map_err(|e| ComputeError::ParseError(e.to_string()))?;

        let expected = self.config.baseline_rows();
        if state.baseline.capacity() != expected || state.sliding.capacity() != expected {
            return Err(ComputeError::StateMismatch(format!(
                "saved windows hold {}/{} rows, configuration expects {expected}",
                state.baseline.capacity(),
                state.sliding.capacity()
            )));
        }
        if state.baseline.len() > expected || state.sliding.len() > expected {
            return Err(ComputeError::StateMismatch(
                "saved window exceeds its capacity".to_string(),
            ));
        }

        self.state = state;
        Ok(())
    }
}
