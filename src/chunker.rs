//! Chunk buffering
//!
//! Groups a stream of samples into engine chunks the way wearable clients batch
//! uploads. Each session buffers on its own: a session's chunk closes as soon as
//! it reaches `max_samples` samples or its first-to-last span reaches `max_span`.
//! Interleaved sessions never close each other's chunks.

use crate::error::ComputeError;
use crate::session::SessionKey;
use crate::types::Sample;
use chrono::Duration;
use std::collections::HashMap;

/// Default maximum samples per chunk
pub const DEFAULT_MAX_SAMPLES: usize = 300;

/// Default maximum chunk duration (seconds)
pub const DEFAULT_MAX_SPAN_SECS: i64 = 12;

/// Limits that close a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub max_samples: usize,
    pub max_span: Duration,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
            max_span: Duration::seconds(DEFAULT_MAX_SPAN_SECS),
        }
    }
}

impl ChunkPolicy {
    pub fn new(max_samples: usize, max_span_secs: i64) -> Result<Self, ComputeError> {
        if max_samples == 0 {
            return Err(ComputeError::InvalidConfig(
                "max_samples must be at least 1".to_string(),
            ));
        }
        if max_span_secs <= 0 {
            return Err(ComputeError::InvalidConfig(format!(
                "max_span_secs must be positive, got {max_span_secs}"
            )));
        }
        Ok(Self {
            max_samples,
            max_span: Duration::seconds(max_span_secs),
        })
    }

    fn is_due(&self, pending: &[Sample]) -> bool {
        if pending.len() >= self.max_samples {
            return true;
        }
        match (pending.first(), pending.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp >= self.max_span,
            _ => false,
        }
    }
}

/// Accumulates samples per session and hands back completed chunks
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    policy: ChunkPolicy,
    pending: HashMap<SessionKey, Vec<Sample>>,
    // first-appearance order of the sessions in `pending`
    order: Vec<SessionKey>,
}

impl ChunkBuffer {
    pub fn new(policy: ChunkPolicy) -> Self {
        Self {
            policy,
            pending: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn policy(&self) -> ChunkPolicy {
        self.policy
    }

    /// Add a sample; returns its session's chunk if this sample completed it
    pub fn push(&mut self, sample: Sample) -> Option<Vec<Sample>> {
        let key = SessionKey::of(&sample);
        if !self.pending.contains_key(&key) {
            self.order.push(key.clone());
        }

        let pending = self.pending.entry(key.clone()).or_default();
        pending.push(sample);

        if self.policy.is_due(pending) {
            self.take(&key)
        } else {
            None
        }
    }

    fn take(&mut self, key: &SessionKey) -> Option<Vec<Sample>> {
        self.order.retain(|k| k != key);
        self.pending.remove(key).filter(|chunk| !chunk.is_empty())
    }

    /// Close one session's open chunk, if any
    pub fn flush_session(&mut self, key: &SessionKey) -> Option<Vec<Sample>> {
        self.take(key)
    }

    /// Close every open chunk, in order of first appearance of each session
    pub fn flush(&mut self) -> Vec<Vec<Sample>> {
        let order = std::mem::take(&mut self.order);
        order
            .iter()
            .filter_map(|key| self.pending.remove(key))
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    /// Samples waiting across all sessions
    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Sessions with an open chunk
    pub fn open_sessions(&self) -> usize {
        self.pending.len()
    }
}

/// Split a batch of samples into chunks under `policy`.
///
/// Produces exactly the chunks a [`ChunkBuffer`] fed the same samples would,
/// followed by a final flush.
pub fn chunk_samples(samples: Vec<Sample>, policy: ChunkPolicy) -> Vec<Vec<Sample>> {
    let mut buffer = ChunkBuffer::new(policy);
    let mut chunks: Vec<Vec<Sample>> = samples
        .into_iter()
        .filter_map(|sample| buffer.push(sample))
        .collect();
    chunks.extend(buffer.flush());
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sample_at(session: &str, ms: i64) -> Sample {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        Sample::new("dev", session, t0 + Duration::milliseconds(ms)).with_ppg(1.0)
    }

    fn sizes(chunks: &[Vec<Sample>]) -> Vec<usize> {
        chunks.iter().map(|c| c.len()).collect()
    }

    #[test]
    fn test_count_limit() {
        let policy = ChunkPolicy::new(3, 60).unwrap();
        let samples: Vec<Sample> = (0..7).map(|i| sample_at("s", i * 10)).collect();

        let chunks = chunk_samples(samples, policy);
        assert_eq!(sizes(&chunks), vec![3, 3, 1]);
    }

    #[test]
    fn test_span_limit() {
        let policy = ChunkPolicy::new(300, 12).unwrap();
        // one sample per second for 30 s
        let samples: Vec<Sample> = (0..30).map(|i| sample_at("s", i * 1000)).collect();

        let chunks = chunk_samples(samples, policy);
        // span reaches 12 s at the 13th sample: 0..=12, 13..=25, then 26..29
        assert_eq!(sizes(&chunks), vec![13, 13, 4]);
    }

    #[test]
    fn test_sessions_buffer_independently() {
        let mut buffer = ChunkBuffer::new(ChunkPolicy::new(3, 60).unwrap());
        assert!(buffer.push(sample_at("a", 0)).is_none());
        assert!(buffer.push(sample_at("b", 5)).is_none());
        assert!(buffer.push(sample_at("a", 10)).is_none());
        assert!(buffer.push(sample_at("b", 15)).is_none());
        assert_eq!(buffer.open_sessions(), 2);
        assert_eq!(buffer.len(), 4);

        let completed = buffer.push(sample_at("a", 20)).unwrap();
        assert_eq!(completed.len(), 3);
        assert!(completed.iter().all(|s| s.session_id == "a"));

        // b's chunk is still open
        assert_eq!(buffer.open_sessions(), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_interleaved_sessions_keep_full_chunks() {
        let mut interleaved = Vec::new();
        for i in 0..24 {
            interleaved.push(sample_at("a", i * 1000));
            interleaved.push(sample_at("b", i * 1000 + 500));
        }

        let chunks = chunk_samples(interleaved, ChunkPolicy::default());
        // each session closes at 13 samples (12 s span); the remaining 11 flush at the end
        assert_eq!(sizes(&chunks), vec![13, 13, 11, 11]);
        let sessions: Vec<&str> = chunks.iter().map(|c| c[0].session_id.as_str()).collect();
        assert_eq!(sessions, vec!["a", "b", "a", "b"]);
        assert!(chunks
            .iter()
            .all(|c| c.iter().all(|s| s.session_id == c[0].session_id)));
    }

    #[test]
    fn test_flush_session() {
        let mut buffer = ChunkBuffer::default();
        buffer.push(sample_at("a", 0));
        buffer.push(sample_at("b", 0));

        let a = buffer.flush_session(&SessionKey::new("dev", "a")).unwrap();
        assert_eq!(a.len(), 1);
        assert!(buffer.flush_session(&SessionKey::new("dev", "a")).is_none());

        let rest = buffer.flush();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0][0].session_id, "b");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_single_sample_policy() {
        let mut buffer = ChunkBuffer::new(ChunkPolicy::new(1, 12).unwrap());
        assert_eq!(buffer.push(sample_at("a", 0)).map(|c| c.len()), Some(1));
        assert_eq!(buffer.push(sample_at("b", 0)).map(|c| c.len()), Some(1));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_invalid_policy() {
        assert!(ChunkPolicy::new(0, 12).is_err());
        assert!(ChunkPolicy::new(10, 0).is_err());
    }

    #[test]
    fn test_flush_empty() {
        let mut buffer = ChunkBuffer::default();
        assert!(buffer.flush().is_empty());
    }
}
