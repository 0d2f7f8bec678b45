//! Core types for the Synheart Stress engine
//!
//! This module defines the data structures that flow through the engine:
//! raw samples in, per-chunk HRV points in the windows, stress results out,
//! and the envelope used to publish results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation from the wearable sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Device label (e.g. "polar-h10")
    pub device: String,
    /// Wall-clock time of the observation (UTC)
    pub timestamp: DateTime<Utc>,
    /// PPG waveform value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppg: Option<f64>,
    /// Instantaneous heart rate (bpm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr: Option<f64>,
    /// Inter-beat intervals reported with this sample (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ibi_ms: Option<Vec<f64>>,
    /// Recording session identifier
    pub session_id: String,
    /// Subject (user) identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc_z: Option<f64>,
    /// Auxiliary PPG channels, carried through but not used by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppg0: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppg2: Option<f64>,
}

impl Sample {
    /// Create an empty sample for a device and session
    pub fn new(
        device: impl Into<String>,
        session_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Sample {
            device: device.into(),
            timestamp,
            ppg: None,
            hr: None,
            ibi_ms: None,
            session_id: session_id.into(),
            subject_id: None,
            acc_x: None,
            acc_y: None,
            acc_z: None,
            ppg0: None,
            ppg2: None,
        }
    }

    pub fn with_ppg(mut self, ppg: f64) -> Self {
        self.ppg = Some(ppg);
        self
    }

    pub fn with_hr(mut self, hr: f64) -> Self {
        self.hr = Some(hr);
        self
    }

    pub fn with_ibi(mut self, ibi_ms: Vec<f64>) -> Self {
        self.ibi_ms = Some(ibi_ms);
        self
    }

    pub fn with_subject_id(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn with_acc(mut self, x: f64, y: f64, z: f64) -> Self {
        self.acc_x = Some(x);
        self.acc_y = Some(y);
        self.acc_z = Some(z);
        self
    }
}

/// HRV snapshot computed once per chunk and kept in the engine windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HrvPoint {
    pub hr_mean: Option<f64>,
    pub rmssd: Option<f64>,
    pub pnn50: Option<f64>,
}

/// Overall status of a processed chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressStatus {
    Success,
    Warning,
}

impl StressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StressStatus::Success => "success",
            StressStatus::Warning => "warning",
        }
    }
}

/// Outcome of the comparison against the frozen baseline window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicStatus {
    Success,
    BasicWarning,
}

impl BasicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasicStatus::Success => "success",
            BasicStatus::BasicWarning => "basic_warning",
        }
    }
}

/// Outcome of the comparison against the trailing sliding window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlidingStatus {
    Success,
    SlidingWarning,
}

impl SlidingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlidingStatus::Success => "success",
            SlidingStatus::SlidingWarning => "sliding_warning",
        }
    }
}

/// Discrete label derived from the logistic-regression score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MlLabel {
    MlStress,
    MlRelaxed,
    MlUncertain,
}

impl MlLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MlLabel::MlStress => "ml_stress",
            MlLabel::MlRelaxed => "ml_relaxed",
            MlLabel::MlUncertain => "ml_uncertain",
        }
    }
}

/// Result of processing one chunk of samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub status: StressStatus,
    pub status_basic: BasicStatus,
    pub status_sliding: SlidingStatus,
    pub hr_mean: Option<f64>,
    pub rmssd: Option<f64>,
    pub pnn50: Option<f64>,
    pub ppg_mean: Option<f64>,
    pub ml_score: Option<f64>,
    pub ml_label: Option<MlLabel>,
}

impl StressResult {
    /// All-null result with no warnings, returned for chunks without samples
    pub fn degenerate() -> Self {
        StressResult {
            status: StressStatus::Success,
            status_basic: BasicStatus::Success,
            status_sliding: SlidingStatus::Success,
            hr_mean: None,
            rmssd: None,
            pnn50: None,
            ppg_mean: None,
            ml_score: None,
            ml_label: None,
        }
    }

    /// True when either threshold detector fired
    pub fn is_warning(&self) -> bool {
        self.status == StressStatus::Warning
    }
}

/// Producer metadata attached to every published result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
    /// Version of the logistic model that produced `ml_score`
    pub model_version: String,
}

/// Session the result belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressSession {
    pub device: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
}

/// Window fill state at the time the result was computed
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StressWindowState {
    pub baseline_rows: usize,
    pub baseline_filled: usize,
    pub sliding_filled: usize,
    /// 1-based index of the chunk within the session
    pub chunk_index: u64,
}

/// Complete published payload (stress.result.v1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressPayload {
    pub schema_version: String,
    pub producer: StressProducer,
    pub session: StressSession,
    pub computed_at_utc: String,
    /// Timestamp of the last sample in the chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at_utc: Option<String>,
    pub window: StressWindowState,
    pub result: StressResult,
}
