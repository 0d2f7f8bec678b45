//! Parsing sample batches from JSON arrays and NDJSON streams

use crate::error::ComputeError;
use crate::schema::validation::{validate_sample, ValidationError};
use crate::types::Sample;

/// Adapter for turning JSON input into validated samples
pub struct SampleAdapter;

impl SampleAdapter {
    /// Parse a JSON string containing an array of samples
    pub fn parse_array(json: &str) -> Result<Vec<Sample>, ComputeError> {
        let samples: Vec<Sample> = serde_json::from_str(json)?;
        Ok(samples)
    }

    /// Parse NDJSON (newline-delimited JSON), one sample per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Sample>, ComputeError> {
        let mut samples = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            samples.push(Self::parse_line(trimmed, line_num + 1)?);
        }
        Ok(samples)
    }

    /// Parse one NDJSON line; `line_num` is 1-based and only used in errors
    pub fn parse_line(line: &str, line_num: usize) -> Result<Sample, ComputeError> {
        serde_json::from_str::<Sample>(line).map_err(|e| {
            ComputeError::ParseError(format!("Failed to parse line {line_num}: {e}"))
        })
    }

    /// Validate a batch, returning only the failures
    pub fn validate_samples(samples: &[Sample]) -> Vec<ValidationResult> {
        samples
            .iter()
            .enumerate()
            .filter_map(|(index, sample)| {
                validate_sample(sample).err().map(|error| ValidationResult {
                    index,
                    session_id: sample.session_id.clone(),
                    error,
                })
            })
            .collect()
    }

    /// Drop invalid samples, logging each one
    pub fn retain_valid(samples: Vec<Sample>) -> Vec<Sample> {
        samples
            .into_iter()
            .enumerate()
            .filter(|(index, sample)| match validate_sample(sample) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("dropping sample {index}: {e}");
                    false
                }
            })
            .map(|(_, sample)| sample)
            .collect()
    }
}

/// A failed sample validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub index: usize,
    pub session_id: String,
    pub error: ValidationError,
}
