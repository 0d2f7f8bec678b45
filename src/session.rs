//! Session routing
//!
//! Hosts that track several recordings at once keep one [`StressEngine`] per
//! session. [`SessionRouter`] owns those engines and writes every result into an
//! injected [`ResultSink`], keyed by session. Nothing here is shared across
//! sessions, and nothing here knows about transport.

use crate::config::EngineConfig;
use crate::engine::StressEngine;
use crate::error::ComputeError;
use crate::types::{Sample, StressResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of a recording session: device label plus session id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub device: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(device: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            session_id: session_id.into(),
        }
    }

    pub fn of(sample: &Sample) -> Self {
        Self::new(sample.device.clone(), sample.session_id.clone())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.device, self.session_id)
    }
}

/// Consumer of stress results (persistence, live broadcast, ...)
pub trait ResultSink {
    fn publish(&mut self, key: &SessionKey, result: &StressResult);
}

impl<F> ResultSink for F
where
    F: FnMut(&SessionKey, &StressResult),
{
    fn publish(&mut self, key: &SessionKey, result: &StressResult) {
        self(key, result)
    }
}

/// Sink that drops every result
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl ResultSink for DiscardSink {
    fn publish(&mut self, _key: &SessionKey, _result: &StressResult) {}
}

/// Sink that keeps results in memory, in arrival order per session
#[derive(Debug, Default)]
pub struct MemorySink {
    results: HashMap<SessionKey, Vec<StressResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self, key: &SessionKey) -> &[StressResult] {
        self.results.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove and return everything published for a session
    pub fn drain(&mut self, key: &SessionKey) -> Vec<StressResult> {
        self.results.remove(key).unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }
}

impl ResultSink for MemorySink {
    fn publish(&mut self, key: &SessionKey, result: &StressResult) {
        self.results
            .entry(key.clone())
            .or_default()
            .push(result.clone());
    }
}

/// One engine per session, results fanned out to a sink
pub struct SessionRouter<S: ResultSink> {
    config: EngineConfig,
    engines: HashMap<SessionKey, StressEngine>,
    sink: S,
}

impl<S: ResultSink> SessionRouter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            config: EngineConfig::default(),
            engines: HashMap::new(),
            sink,
        }
    }

    pub fn with_config(config: EngineConfig, sink: S) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            engines: HashMap::new(),
            sink,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process a chunk for the session named by its first sample.
    ///
    /// A session seen for the first time starts from a fresh engine. Samples
    /// from other sessions in the same chunk are ignored.
    pub fn process_chunk(
        &mut self,
        rows: &[Sample],
        sampling_hz: u32,
    ) -> Result<(SessionKey, StressResult), ComputeError> {
        let first = rows.first().ok_or(ComputeError::EmptyChunk)?;
        let key = SessionKey::of(first);

        let foreign = rows
            .iter()
            .filter(|r| r.device != key.device || r.session_id != key.session_id)
            .count();

        let engine = self.engine_for(&key);
        let result = if foreign == 0 {
            engine.process_chunk(rows, sampling_hz)
        } else {
            log::warn!("session {key}: ignoring {foreign} samples from other sessions");
            let own: Vec<Sample> = rows
                .iter()
                .filter(|r| r.device == key.device && r.session_id == key.session_id)
                .cloned()
                .collect();
            engine.process_chunk(&own, sampling_hz)
        };

        self.sink.publish(&key, &result);
        Ok((key, result))
    }

    fn engine_for(&mut self, key: &SessionKey) -> &mut StressEngine {
        let config = &self.config;
        self.engines.entry(key.clone()).or_insert_with(|| {
            log::info!("session {key}: starting new engine");
            // Config was validated at construction
            let mut engine = StressEngine::with_config(config.clone()).unwrap_or_default();
            engine.reset();
            engine
        })
    }

    /// Engine currently tracking a session, if any
    pub fn engine(&self, key: &SessionKey) -> Option<&StressEngine> {
        self.engines.get(key)
    }

    /// Mutable engine access, e.g. to restore saved state before the first chunk
    pub fn engine_mut(&mut self, key: &SessionKey) -> &mut StressEngine {
        self.engine_for(key)
    }

    /// Clear a session's windows without forgetting the session
    pub fn reset_session(&mut self, key: &SessionKey) {
        if let Some(engine) = self.engines.get_mut(key) {
            log::info!("session {key}: reset");
            engine.reset();
        }
    }

    /// Drop a session's engine; returns false if it was unknown
    pub fn end_session(&mut self, key: &SessionKey) -> bool {
        let removed = self.engines.remove(key).is_some();
        if removed {
            log::info!("session {key}: ended");
        }
        removed
    }

    pub fn active_sessions(&self) -> usize {
        self.engines.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
