//! Signal conditioning
//!
//! Normalization and peak picking over a raw PPG waveform, used when a chunk
//! carries no direct inter-beat intervals.

/// Default refractory distance between accepted peaks (samples)
pub const DEFAULT_PEAK_MIN_DISTANCE: usize = 50;

/// Default minimum z-score a sample must exceed to be a peak
pub const DEFAULT_PEAK_MIN_HEIGHT: f64 = 0.2;

/// Z-score normalize a series using the population standard deviation.
///
/// A constant series maps to all zeros instead of dividing by zero.
pub fn z_score_normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let sd = variance.sqrt();

    if sd == 0.0 {
        return vec![0.0; values.len()];
    }

    values.iter().map(|x| (x - mean) / sd).collect()
}

/// Find local maxima above `min_height`, at least `min_distance` samples apart.
///
/// Endpoints are never peaks. A plateau resolves to its left-most sample
/// because the right-hand comparison is non-strict.
pub fn find_peaks_simple(z: &[f64], min_distance: usize, min_height: f64) -> Vec<usize> {
    let mut peaks = Vec::new();
    if z.len() < 3 {
        return peaks;
    }

    let mut last: Option<usize> = None;

    for i in 1..z.len() - 1 {
        let spaced = last.map_or(true, |l| i - l >= min_distance);
        if spaced && z[i] > min_height && z[i] > z[i - 1] && z[i] >= z[i + 1] {
            peaks.push(i);
            last = Some(i);
        }
    }

    peaks
}
