//! Sample wire schema
//!
//! JSON input format for raw sensor samples (`stress.sample.v1`) and the
//! validation applied before samples reach the engine.

mod adapter;
mod validation;

pub use adapter::*;
pub use validation::*;
