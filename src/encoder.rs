//! Result encoding
//!
//! Wraps a [`StressResult`] in the `stress.result.v1` envelope that reporting
//! collaborators consume: producer, session identity, timing and window fill.

use crate::engine::StressEngine;
use crate::error::ComputeError;
use crate::schema::RESULT_SCHEMA_VERSION;
use crate::types::{
    Sample, StressPayload, StressProducer, StressResult, StressSession, StressWindowState,
};
use crate::{PRODUCER_NAME, STRESS_VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Encoder producing result envelopes
pub struct ResultEncoder {
    instance_id: String,
}

impl Default for ResultEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode the result computed for `chunk` by `engine`
    pub fn encode(
        &self,
        chunk: &[Sample],
        engine: &StressEngine,
        result: &StressResult,
    ) -> Result<StressPayload, ComputeError> {
        let first = chunk
            .first()
            .ok_or_else(|| ComputeError::EncodingError("cannot encode an empty chunk".to_string()))?;

        let subject_id = chunk.iter().find_map(|s| s.subject_id.clone());
        let observed_at = chunk.iter().map(|s| s.timestamp).max();

        let producer = StressProducer {
            name: PRODUCER_NAME.to_string(),
            version: STRESS_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
            model_version: engine.config().model.version.clone(),
        };

        let session = StressSession {
            device: first.device.clone(),
            session_id: first.session_id.clone(),
            subject_id,
        };

        let window = StressWindowState {
            baseline_rows: engine.baseline_rows(),
            baseline_filled: engine.baseline_window().len(),
            sliding_filled: engine.sliding_window().len(),
            chunk_index: engine.total_count(),
        };

        Ok(StressPayload {
            schema_version: RESULT_SCHEMA_VERSION.to_string(),
            producer,
            session,
            computed_at_utc: Utc::now().to_rfc3339(),
            observed_at_utc: observed_at.map(|t| t.to_rfc3339()),
            window,
            result: result.clone(),
        })
    }

    /// Encode to a compact JSON string
    pub fn encode_to_json(
        &self,
        chunk: &[Sample],
        engine: &StressEngine,
        result: &StressResult,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(chunk, engine, result)?;
        serde_json::to_string(&payload).map_err(ComputeError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn chunk() -> Vec<Sample> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        vec![
            Sample::new("polar", "sess-9", t0).with_ibi(vec![800.0; 4]),
            Sample::new("polar", "sess-9", t0 + Duration::seconds(5))
                .with_hr(74.0)
                .with_subject_id("user-1"),
        ]
    }

    #[test]
    fn test_encode_envelope() {
        let mut engine = StressEngine::new();
        let rows = chunk();
        let result = engine.process_chunk(&rows, 130);

        let encoder = ResultEncoder::with_instance_id("inst-1".to_string());
        let json = encoder.encode_to_json(&rows, &engine, &result).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["schema_version"], "stress.result.v1");
        assert_eq!(payload["producer"]["name"], "synheart-stress");
        assert_eq!(payload["producer"]["instance_id"], "inst-1");
        assert_eq!(payload["producer"]["model_version"], "lr-hr-rmssd-pnn50.v1");
        assert_eq!(payload["session"]["device"], "polar");
        assert_eq!(payload["session"]["session_id"], "sess-9");
        assert_eq!(payload["session"]["subject_id"], "user-1");
        assert_eq!(payload["observed_at_utc"], "2024-01-15T08:00:05+00:00");
        assert_eq!(payload["window"]["baseline_rows"], 50);
        assert_eq!(payload["window"]["baseline_filled"], 1);
        assert_eq!(payload["window"]["chunk_index"], 1);
        assert_eq!(payload["result"]["status"], "success");
        assert_eq!(payload["result"]["hr_mean"], 74.0);
        assert_eq!(payload["result"]["rmssd"], 0.0);
    }

    #[test]
    fn test_empty_chunk_cannot_encode() {
        let engine = StressEngine::new();
        let encoder = ResultEncoder::new();
        let result = StressResult::degenerate();
        assert!(matches!(
            encoder.encode(&[], &engine, &result),
            Err(ComputeError::EncodingError(_))
        ));
    }

    #[test]
    fn test_unique_instance_ids() {
        assert_ne!(ResultEncoder::new().instance_id(), ResultEncoder::new().instance_id());
    }
}
