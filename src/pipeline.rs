//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Stress.
//! It takes raw sample JSON through chunking, per-session engines and result
//! encoding.

use crate::chunker::{chunk_samples, ChunkBuffer, ChunkPolicy};
use crate::config::{EngineConfig, DEFAULT_PPG_SAMPLING_HZ};
use crate::encoder::ResultEncoder;
use crate::engine::StressEngine;
use crate::error::ComputeError;
use crate::schema::{validate_sample, SampleAdapter};
use crate::session::{DiscardSink, ResultSink, SessionKey, SessionRouter};
use crate::types::{Sample, StressPayload};

/// Convert one chunk of samples (JSON array) into a result envelope (stateless).
///
/// A fresh engine is used, so baseline and sliding detection never fire here;
/// use [`StressProcessor`] to keep windows across chunks.
///
/// # Example
/// ```ignore
/// let payload_json = samples_to_stress(samples_json, 130)?;
/// ```
pub fn samples_to_stress(samples_json: String, sampling_hz: u32) -> Result<String, ComputeError> {
    let samples = SampleAdapter::parse_array(&samples_json)?;
    if samples.is_empty() {
        return Err(ComputeError::EmptyChunk);
    }
    check_samples(&samples)?;

    let mut engine = StressEngine::new();
    let result = engine.process_chunk(&samples, sampling_hz);
    ResultEncoder::new().encode_to_json(&samples, &engine, &result)
}

fn check_samples(samples: &[Sample]) -> Result<(), ComputeError> {
    for (index, sample) in samples.iter().enumerate() {
        validate_sample(sample)
            .map_err(|e| ComputeError::ParseError(format!("Invalid sample {index}: {e}")))?;
    }
    Ok(())
}

/// Stateful processor with per-session windows.
///
/// Use this when chunks of the same session arrive over several calls.
pub struct StressProcessor<S: ResultSink = DiscardSink> {
    router: SessionRouter<S>,
    encoder: ResultEncoder,
    buffer: ChunkBuffer,
    sampling_hz: u32,
}

impl Default for StressProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl StressProcessor {
    /// Create a processor with default engine settings and chunking policy
    pub fn new() -> Self {
        Self {
            router: SessionRouter::new(DiscardSink),
            encoder: ResultEncoder::new(),
            buffer: ChunkBuffer::new(ChunkPolicy::default()),
            sampling_hz: DEFAULT_PPG_SAMPLING_HZ,
        }
    }

    /// Create a processor with a specific configuration
    pub fn with_config(
        config: EngineConfig,
        policy: ChunkPolicy,
        sampling_hz: u32,
    ) -> Result<Self, ComputeError> {
        Self::with_sink(config, policy, sampling_hz, DiscardSink)
    }
}

impl<S: ResultSink> StressProcessor<S> {
    /// Create a processor that also publishes every result to `sink`
    pub fn with_sink(
        config: EngineConfig,
        policy: ChunkPolicy,
        sampling_hz: u32,
        sink: S,
    ) -> Result<Self, ComputeError> {
        if sampling_hz == 0 {
            return Err(ComputeError::InvalidConfig(
                "sampling_hz must be positive".to_string(),
            ));
        }
        Ok(Self {
            router: SessionRouter::with_config(config, sink)?,
            encoder: ResultEncoder::new(),
            buffer: ChunkBuffer::new(policy),
            sampling_hz,
        })
    }

    pub fn sampling_hz(&self) -> u32 {
        self.sampling_hz
    }

    pub fn router(&self) -> &SessionRouter<S> {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut SessionRouter<S> {
        &mut self.router
    }

    /// Process an already-formed chunk and return its envelope
    pub fn process_chunk(&mut self, chunk: &[Sample]) -> Result<StressPayload, ComputeError> {
        let (key, result) = self.router.process_chunk(chunk, self.sampling_hz)?;
        let engine = self
            .router
            .engine(&key)
            .ok_or_else(|| ComputeError::EncodingError(format!("no engine for session {key}")))?;
        self.encoder.encode(chunk, engine, &result)
    }

    /// Process a chunk given as a JSON array of samples
    pub fn process_chunk_json(&mut self, samples_json: &str) -> Result<String, ComputeError> {
        let samples = SampleAdapter::parse_array(samples_json)?;
        check_samples(&samples)?;
        let payload = self.process_chunk(&samples)?;
        serde_json::to_string(&payload).map_err(ComputeError::JsonError)
    }

    /// Split a batch into per-session chunks and process each one.
    ///
    /// Yields the same chunks, in the same order, as feeding every sample to
    /// [`push_sample`](Self::push_sample) and then calling [`finish`](Self::finish).
    pub fn process_batch(&mut self, samples: Vec<Sample>) -> Result<Vec<StressPayload>, ComputeError> {
        check_samples(&samples)?;
        let chunks = chunk_samples(samples, self.buffer.policy());
        chunks.iter().map(|chunk| self.process_chunk(chunk)).collect()
    }

    /// Feed one streamed sample; returns the envelope of the chunk it completed
    pub fn push_sample(&mut self, sample: Sample) -> Result<Option<StressPayload>, ComputeError> {
        validate_sample(&sample).map_err(|e| ComputeError::ParseError(e.to_string()))?;
        match self.buffer.push(sample) {
            Some(chunk) => self.process_chunk(&chunk).map(Some),
            None => Ok(None),
        }
    }

    /// Process every chunk still buffered, one per open session
    pub fn finish(&mut self) -> Result<Vec<StressPayload>, ComputeError> {
        let chunks = self.buffer.flush();
        chunks.iter().map(|chunk| self.process_chunk(chunk)).collect()
    }

    /// Process one session's buffered samples, e.g. when its recording stops
    pub fn finish_session(&mut self, key: &SessionKey) -> Result<Option<StressPayload>, ComputeError> {
        match self.buffer.flush_session(key) {
            Some(chunk) => self.process_chunk(&chunk).map(Some),
            None => Ok(None),
        }
    }

    /// Save a session's engine state to JSON
    pub fn save_session_state(&self, key: &SessionKey) -> Result<String, ComputeError> {
        self.router
            .engine(key)
            .ok_or_else(|| ComputeError::StateMismatch(format!("unknown session {key}")))?
            .save_state()
    }

    /// Restore a session's engine state before continuing it
    pub fn load_session_state(&mut self, key: &SessionKey, json: &str) -> Result<(), ComputeError> {
        self.router.engine_mut(key).load_state(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySink;
    use pretty_assertions::assert_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn sample_json() -> &'static str {
        r#"[
            {"device":"polar","timestamp":"2024-01-15T08:00:00Z","session_id":"s1","hr":70.0},
            {"device":"polar","timestamp":"2024-01-15T08:00:01Z","session_id":"s1","ibi_ms":[800.0,860.0,800.0,860.0]}
        ]"#
    }

    fn ibi_stream(session: &str, seconds: i64) -> Vec<Sample> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        (0..seconds)
            .map(|i| {
                Sample::new("polar", session, t0 + Duration::seconds(i))
                    .with_hr(70.0)
                    .with_ibi(vec![820.0, 880.0])
            })
            .collect()
    }

    #[test]
    fn test_samples_to_stress() {
        let json = samples_to_stress(sample_json().to_string(), 130).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["schema_version"], "stress.result.v1");
        assert_eq!(payload["result"]["status"], "success");
        assert_eq!(payload["result"]["hr_mean"], 70.0);
        assert_eq!(payload["result"]["rmssd"], 60.0);
        assert_eq!(payload["result"]["pnn50"], 100.0);
        assert_eq!(payload["window"]["chunk_index"], 1);
    }

    #[test]
    fn test_samples_to_stress_errors() {
        assert!(samples_to_stress("not valid json".to_string(), 130).is_err());
        assert!(matches!(
            samples_to_stress("[]".to_string(), 130),
            Err(ComputeError::EmptyChunk)
        ));
        let bad = r#"[{"device":"","timestamp":"2024-01-15T08:00:00Z","session_id":"s"}]"#;
        assert!(matches!(
            samples_to_stress(bad.to_string(), 130),
            Err(ComputeError::ParseError(_))
        ));
    }

    #[test]
    fn test_processor_keeps_windows() {
        let mut processor = StressProcessor::new();
        for _ in 0..3 {
            processor.process_chunk_json(sample_json()).unwrap();
        }
        let json = processor.process_chunk_json(sample_json()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(payload["window"]["chunk_index"], 4);
        assert_eq!(payload["window"]["baseline_filled"], 4);
    }

    #[test]
    fn test_process_batch_chunks_by_time() {
        let mut processor =
            StressProcessor::with_config(EngineConfig::default(), ChunkPolicy::default(), 130).unwrap();

        // 60 s at 1 Hz with a 12 s span limit -> chunks of 13, 13, 13, 13, 8
        let payloads = processor.process_batch(ibi_stream("s1", 60)).unwrap();
        assert_eq!(payloads.len(), 5);
        assert_eq!(payloads[4].window.chunk_index, 5);
        assert!(payloads.iter().all(|p| p.session.session_id == "s1"));
    }

    #[test]
    fn test_streaming_matches_batch() {
        let mut streaming = StressProcessor::new();
        let mut emitted = Vec::new();
        for sample in ibi_stream("s1", 30) {
            emitted.extend(streaming.push_sample(sample).unwrap());
        }
        emitted.extend(streaming.finish().unwrap());

        let mut batch = StressProcessor::new();
        let batched = batch.process_batch(ibi_stream("s1", 30)).unwrap();

        assert_eq!(emitted.len(), batched.len());
        for (a, b) in emitted.iter().zip(batched.iter()) {
            assert_eq!(a.result, b.result);
        }
        assert!(streaming.finish().unwrap().is_empty());
    }

    #[test]
    fn test_sink_receives_results() {
        let mut processor = StressProcessor::with_sink(
            EngineConfig::default(),
            ChunkPolicy::default(),
            130,
            MemorySink::new(),
        )
        .unwrap();
        processor.process_batch(ibi_stream("s1", 30)).unwrap();
        processor.process_batch(ibi_stream("s2", 5)).unwrap();

        let s1 = SessionKey::new("polar", "s1");
        let sink = processor.router().sink();
        assert_eq!(sink.results(&s1).len(), 3);
        assert_eq!(sink.results(&SessionKey::new("polar", "s2")).len(), 1);

        let drained = processor.router_mut().sink_mut().drain(&s1);
        assert_eq!(drained.len(), 3);
        assert!(drained.iter().all(|r| !r.is_warning()));

        let sink = processor.router_mut().sink_mut();
        assert!(sink.results(&s1).is_empty());
        assert_eq!(sink.total(), 1);
    }

    #[test]
    fn test_session_state_roundtrip() {
        let key = SessionKey::new("polar", "s1");
        let mut processor = StressProcessor::new();
        processor.process_batch(ibi_stream("s1", 30)).unwrap();
        let saved = processor.save_session_state(&key).unwrap();

        let mut resumed = StressProcessor::new();
        resumed.load_session_state(&key, &saved).unwrap();
        let payloads = resumed.process_batch(ibi_stream("s1", 5)).unwrap();
        assert_eq!(payloads[0].window.chunk_index, 4);

        assert!(resumed
            .save_session_state(&SessionKey::new("polar", "unknown"))
            .is_err());
    }

    #[test]
    fn test_interleaved_batch_grouped_by_session() {
        let mut samples = Vec::new();
        for (a, b) in ibi_stream("s1", 5).into_iter().zip(ibi_stream("s2", 5)) {
            samples.push(a);
            samples.push(b);
        }
        let mut processor = StressProcessor::new();
        let payloads = processor.process_batch(samples).unwrap();

        let sessions: Vec<&str> = payloads.iter().map(|p| p.session.session_id.as_str()).collect();
        assert_eq!(sessions, vec!["s1", "s2"]);
        assert_eq!(processor.router().active_sessions(), 2);
    }

    fn interleave(a: Vec<Sample>, b: Vec<Sample>) -> Vec<Sample> {
        a.into_iter().zip(b).flat_map(|(x, y)| [x, y]).collect()
    }

    #[test]
    fn test_interleaved_streaming_matches_batch() {
        let samples = interleave(ibi_stream("s1", 24), ibi_stream("s2", 24));

        let mut streaming = StressProcessor::new();
        let mut emitted = Vec::new();
        for sample in samples.clone() {
            emitted.extend(streaming.push_sample(sample).unwrap());
        }
        emitted.extend(streaming.finish().unwrap());

        let mut batch = StressProcessor::new();
        let batched = batch.process_batch(samples).unwrap();

        // 13 + 11 samples per session
        assert_eq!(emitted.len(), 4);
        assert_eq!(emitted.len(), batched.len());
        for (a, b) in emitted.iter().zip(batched.iter()) {
            assert_eq!(a.session.session_id, b.session.session_id);
            assert_eq!(a.window.chunk_index, b.window.chunk_index);
            assert_eq!(a.result, b.result);
        }

        assert_eq!(emitted[0].result.rmssd, Some(60.0));
        let s1 = SessionKey::new("polar", "s1");
        let engine = streaming.router().engine(&s1).unwrap();
        assert_eq!(engine.baseline_window().len(), 2);
    }

    #[test]
    fn test_finish_session_leaves_others_open() {
        let mut processor = StressProcessor::new();
        for sample in interleave(ibi_stream("s1", 3), ibi_stream("s2", 3)) {
            assert!(processor.push_sample(sample).unwrap().is_none());
        }

        let s1 = SessionKey::new("polar", "s1");
        let payload = processor.finish_session(&s1).unwrap().unwrap();
        assert_eq!(payload.session.session_id, "s1");
        assert!(processor.finish_session(&s1).unwrap().is_none());

        let rest = processor.finish().unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].session.session_id, "s2");
    }

    #[test]
    fn test_zero_sampling_rate_rejected() {
        assert!(StressProcessor::with_config(EngineConfig::default(), ChunkPolicy::default(), 0).is_err());
    }
}
