//! stress.sample.v1 validation

use crate::types::Sample;

/// Input schema identifier
pub const SAMPLE_SCHEMA_VERSION: &str = "stress.sample.v1";

/// Output schema identifier
pub const RESULT_SCHEMA_VERSION: &str = "stress.result.v1";

/// Validation errors for raw samples
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing device label")]
    MissingDevice,

    #[error("Missing session id")]
    MissingSessionId,

    #[error("Non-finite value in field {field}")]
    NonFinite { field: &'static str },
}

/// Validate a single sample.
///
/// Out-of-range physiology (e.g. HR of 400 bpm) is not an error: the engine
/// filters it. Only structurally unusable samples are rejected.
pub fn validate_sample(sample: &Sample) -> Result<(), ValidationError> {
    if sample.device.trim().is_empty() {
        return Err(ValidationError::MissingDevice);
    }
    if sample.session_id.trim().is_empty() {
        return Err(ValidationError::MissingSessionId);
    }

    let scalars = [
        ("ppg", sample.ppg),
        ("hr", sample.hr),
        ("acc_x", sample.acc_x),
        ("acc_y", sample.acc_y),
        ("acc_z", sample.acc_z),
        ("ppg0", sample.ppg0),
        ("ppg2", sample.ppg2),
    ];
    for (field, value) in scalars {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(ValidationError::NonFinite { field });
        }
    }

    if let Some(ibi) = &sample.ibi_ms {
        if ibi.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::NonFinite { field: "ibi_ms" });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_valid_sample() {
        let sample = Sample::new("dev", "s", Utc::now()).with_hr(400.0);
        assert!(validate_sample(&sample).is_ok());
    }

    #[test]
    fn test_missing_identity() {
        let sample = Sample::new(" ", "s", Utc::now());
        assert_eq!(validate_sample(&sample), Err(ValidationError::MissingDevice));

        let sample = Sample::new("dev", "", Utc::now());
        assert_eq!(validate_sample(&sample), Err(ValidationError::MissingSessionId));
    }

    #[test]
    fn test_non_finite() {
        let sample = Sample::new("dev", "s", Utc::now()).with_ppg(f64::NAN);
        assert_eq!(
            validate_sample(&sample),
            Err(ValidationError::NonFinite { field: "ppg" })
        );

        let sample = Sample::new("dev", "s", Utc::now()).with_ibi(vec![800.0, f64::INFINITY]);
        assert_eq!(
            validate_sample(&sample),
            Err(ValidationError::NonFinite { field: "ibi_ms" })
        );

        let sample = Sample::new("dev", "s", Utc::now()).with_acc(0.0, f64::NAN, 0.0);
        assert_eq!(
            validate_sample(&sample),
            Err(ValidationError::NonFinite { field: "acc_y" })
        );
    }
}
