//! Baseline and sliding windows of HRV points
//!
//! The baseline window is the session's calm reference: it fills with the first
//! `capacity` points and is frozen from then on. The sliding window always holds
//! the most recent `capacity` points. Both feed the same three-way threshold rule.

use crate::config::is_valid_heart_rate;
use crate::types::HrvPoint;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Threshold ratios used by the detection rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub hr_ratio: f64,
    pub rmssd_ratio: f64,
    pub pnn50_ratio: f64,
}

/// Reference averages computed over one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowAverages {
    pub hr_mean: Option<f64>,
    pub rmssd: Option<f64>,
    pub pnn50: Option<f64>,
}

impl WindowAverages {
    fn from_points<'a>(points: impl Iterator<Item = &'a HrvPoint> + Clone) -> Self {
        WindowAverages {
            hr_mean: average(
                points
                    .clone()
                    .filter_map(|p| p.hr_mean)
                    .filter(|&hr| is_valid_heart_rate(hr)),
            ),
            rmssd: average(points.clone().filter_map(|p| p.rmssd)),
            pnn50: average(points.filter_map(|p| p.pnn50)),
        }
    }

    /// True only if HRV dropped, heart rate rose and pNN50 dropped, all at once.
    ///
    /// Any missing operand means no warning.
    pub fn indicates_stress(&self, current: &HrvPoint, thresholds: &Thresholds) -> bool {
        let hrv_drop = matches!(
            (current.rmssd, self.rmssd),
            (Some(rmssd), Some(base)) if rmssd * thresholds.rmssd_ratio < base
        );
        let hr_rise = matches!(
            (current.hr_mean, self.hr_mean),
            (Some(hr), Some(base)) if hr > base * thresholds.hr_ratio
        );
        let pnn_drop = matches!(
            (current.pnn50, self.pnn50),
            (Some(pnn50), Some(base)) if pnn50 * thresholds.pnn50_ratio < base
        );

        hrv_drop && hr_rise && pnn_drop
    }
}

/// Append-only window of the first `capacity` points of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineWindow {
    points: Vec<HrvPoint>,
    capacity: usize,
}

impl BaselineWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point while below capacity. Returns false once frozen.
    pub fn push(&mut self, point: HrvPoint) -> bool {
        if self.points.len() < self.capacity {
            self.points.push(point);
            true
        } else {
            false
        }
    }

    pub fn is_full(&self) -> bool {
        self.points.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn points(&self) -> &[HrvPoint] {
        &self.points
    }

    pub fn averages(&self) -> WindowAverages {
        WindowAverages::from_points(self.points.iter())
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// FIFO window holding the most recent `capacity` points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlidingWindow {
    points: VecDeque<HrvPoint>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a point, evicting the oldest beyond capacity
    pub fn push(&mut self, point: HrvPoint) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.points.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn points(&self) -> impl Iterator<Item = &HrvPoint> {
        self.points.iter()
    }

    pub fn averages(&self) -> WindowAverages {
        WindowAverages::from_points(self.points.iter())
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Mean of an iterator, `None` when empty
pub fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
