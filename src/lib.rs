//! Synheart Stress - On-device HRV and stress estimation for wearable sessions
//!
//! Stress turns chunks of timestamped wearable samples (PPG, heart rate,
//! inter-beat intervals) into per-chunk results through a deterministic pipeline:
//! NN interval extraction → RMSSD/pNN50 → baseline and sliding window comparison
//! → logistic stress score → result encoding.
//!
//! ## Modules
//!
//! - **Engine**: One stateful [`StressEngine`] per recording session
//! - **Sessions**: [`SessionRouter`] fans results from many sessions into a [`ResultSink`]
//! - **Pipeline**: JSON in, `stress.result.v1` envelopes out

pub mod chunker;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod hrv;
pub mod intervals;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod signal;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use chunker::{chunk_samples, ChunkBuffer, ChunkPolicy};
pub use classifier::{ml_label_from_score, ml_stress_probability, LogisticModel};
pub use config::EngineConfig;
pub use engine::StressEngine;
pub use error::ComputeError;
pub use pipeline::{samples_to_stress, StressProcessor};
pub use session::{DiscardSink, MemorySink, ResultSink, SessionKey, SessionRouter};
pub use types::{HrvPoint, MlLabel, Sample, StressPayload, StressResult};

// Schema exports
pub use schema::{SampleAdapter, RESULT_SCHEMA_VERSION, SAMPLE_SCHEMA_VERSION};

/// Library version embedded in all result envelopes
pub const STRESS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for result envelopes
pub const PRODUCER_NAME: &str = "synheart-stress";
