mod boundary;
mod cluster;
mod config;
mod coordinator;
mod delimiter;
mod markers;
mod normalize;
mod smart_math;
mod validate;


pub use config::{DuplicatePolicy, ExtractionConfig, FULL_POLICY, TWO_PHASE_POLICY};
pub use coordinator::ExerciseExtractor;
