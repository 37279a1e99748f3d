//! Gemini API integration for long-running video generation.
//!
//! This crate provides:
//! - The `GenerationClient` and `ArtifactFetcher` seams used by the queue
//! - `VeoClient`, the HTTP implementation of submit/poll
//! - `HttpArtifactFetcher`, which downloads previews and exports videos

pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod veo;

pub use client::{ArtifactRef, GenerationClient, GenerationRequest, Operation};
pub use config::GenAiConfig;
pub use error::{GenAiError, GenAiResult};
pub use fetcher::{ArtifactFetcher, ExportOutcome, HttpArtifactFetcher, MaterializedArtifact};
pub use veo::VeoClient;
