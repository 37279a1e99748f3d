//! Shared data models for the VEO batch generator.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, their lifecycle status and failure kinds
//! - Generation parameters (model, aspect ratio, seed, reference image)
//! - Output naming settings
//! - The API credential

pub mod credential;
pub mod generation;
pub mod job;
pub mod naming;

// Re-export common types
pub use credential::{ApiKey, ApiKeyError};
pub use generation::{AspectRatio, AspectRatioParseError, GenerationConfig, ModelId, ReferenceImage};
pub use job::{
    FailureKind, Job, JobId, JobResult, JobSpec, JobSpecError, JobStatus, TransitionError, MAX_BATCH_SIZE,
};
pub use naming::{NamingPosition, NamingPositionParseError, NamingSettings};
