//! Interval extraction
//!
//! Builds the NN-interval series (ms) for a chunk, either from reported
//! inter-beat intervals or from PPG peak positions.

use crate::signal::{find_peaks_simple, z_score_normalize};
use crate::types::Sample;

/// Lower plausibility bound for a reported IBI (exclusive, ms)
pub const MIN_IBI_MS: f64 = 250.0;

/// Upper plausibility bound for a reported IBI (exclusive, ms)
pub const MAX_IBI_MS: f64 = 2000.0;

/// Source the NN series was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NnSource {
    /// Directly reported inter-beat intervals
    Ibi,
    /// Peaks detected in the PPG waveform
    Ppg,
}

/// Convert consecutive peak indices into intervals in milliseconds.
pub fn nn_intervals_from_peaks(peaks: &[usize], sampling_hz: u32) -> Vec<f64> {
    if peaks.len() < 2 || sampling_hz == 0 {
        return Vec::new();
    }

    let ms_per_sample = 1000.0 / sampling_hz as f64;
    peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 * ms_per_sample)
        .collect()
}

/// True if an IBI value is finite and physiologically plausible
pub fn is_plausible_ibi(ibi_ms: f64) -> bool {
    ibi_ms.is_finite() && ibi_ms > MIN_IBI_MS && ibi_ms < MAX_IBI_MS
}

/// Flatten all reported IBIs in a chunk, in order, dropping implausible values.
pub fn collect_ibi(rows: &[Sample]) -> Vec<f64> {
    let mut dropped = 0usize;
    let ibi: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.ibi_ms.as_deref())
        .flatten()
        .copied()
        .filter(|&v| {
            let keep = is_plausible_ibi(v);
            if !keep {
                dropped += 1;
            }
            keep
        })
        .collect();

    if dropped > 0 {
        log::warn!("dropped {dropped} implausible IBI values outside ({MIN_IBI_MS}, {MAX_IBI_MS}) ms");
    }
    ibi
}

/// Derive NN intervals from a raw PPG series via z-score and peak detection.
pub fn nn_intervals_from_ppg(
    ppg: &[f64],
    sampling_hz: u32,
    min_distance: usize,
    min_height: f64,
) -> Vec<f64> {
    let z = z_score_normalize(ppg);
    let peaks = find_peaks_simple(&z, min_distance, min_height);
    nn_intervals_from_peaks(&peaks, sampling_hz)
}
