//! # autoreel
//!
//! Backend library that turns a subject (or a ready-made script) into
//! narrated short videos built from stock or local footage.
//!
//! ## Design Philosophy
//!
//! autoreel is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Pluggable** - Script generation, speech, subtitles and compositing are traits
//! - **Sensible defaults** - Works out of the box with a minimal configuration
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use autoreel::{ApiKeys, Collaborators, Config, Pipeline, Stage, TaskId, VideoParams};
//!
//! # async fn example(services: Collaborators) -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.providers.pexels_api_keys = ApiKeys::Single("your-key".to_string());
//!
//! let pipeline = Pipeline::new(config, services).await?;
//!
//! // Subscribe to events
//! let mut events = pipeline.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! let params = VideoParams {
//!     video_subject: "why the sea is salty".to_string(),
//!     ..Default::default()
//! };
//! let task = pipeline.run(TaskId::generate(), params, Stage::Video).await?;
//! println!("videos: {:?}", task.videos);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Footage download, acquisition and local materials
pub mod material;
/// Media probing and validation (ffmpeg/ffprobe)
pub mod media;
/// Video generation pipeline (decomposed into per-stage submodules)
pub mod pipeline;
/// Stock-footage search providers
pub mod providers;
/// Retry logic for interrupted transfers
pub mod retry;
/// External collaborator contracts
pub mod services;
/// Task state store
pub mod state;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{ApiKeys, Config, StateConfig, SubtitleProvider};
pub use error::{DownloadError, Error, Result, SearchError, StageError, StoreError};
pub use media::{CliMediaProbe, MediaProbe, NoOpMediaProbe, ProbeCapabilities};
pub use pipeline::Pipeline;
pub use services::{
    AdInsert, Collaborators, CombineRequest, Compositor, RenderRequest, ScriptGenerator,
    SpeechResult, SpeechSynthesizer, SpeechTiming, SubtitleGenerator, WordBoundary,
};
pub use state::{MemoryTaskStore, SqliteTaskStore, TaskStore};
pub use types::{
    ConcatMode, Event, MaterialInfo, MaterialProvider, RenderSettings, Stage, Task, TaskId,
    TaskState, TaskUpdate, VideoAspect, VideoParams, VideoSource, VideoTerms,
};
