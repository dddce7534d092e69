//! Error types for autoreel
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Search, Download, Stage, Store)
//! - Machine-readable error codes recorded on failed tasks and events
//! - Context information (url, path, segment, output index)

use crate::types::{Stage, TaskId, TaskState};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for autoreel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for autoreel
///
/// Stage failures never escape [`Pipeline::run`](crate::Pipeline::run): they are
/// recorded on the task. Only configuration, parameter and store errors reach
/// the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "pexels_api_keys")
        key: Option<String>,
    },

    /// Caller supplied malformed task parameters
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Stock-footage search failed
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Material download failed
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// A pipeline stage did not meet its success condition
    #[error("stage failed: {0}")]
    Stage(#[from] StageError),

    /// Task state store rejected an operation
    #[error("task store error: {0}")]
    Store(#[from] StoreError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (ffmpeg, ffprobe, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Stock-footage provider search errors (always non-fatal to a run)
#[derive(Debug, Error)]
pub enum SearchError {
    /// The HTTP request failed
    #[error("request to {provider} failed: {reason}")]
    Request {
        /// Provider tag
        provider: &'static str,
        /// Underlying failure
        reason: String,
    },

    /// The provider answered with a non-success status
    #[error("{provider} answered with HTTP {status}")]
    Status {
        /// Provider tag
        provider: &'static str,
        /// HTTP status code
        status: u16,
    },

    /// The response body did not have the expected shape
    #[error("unexpected response from {provider}: {reason}")]
    MalformedResponse {
        /// Provider tag
        provider: &'static str,
        /// What was wrong with the body
        reason: String,
    },
}

/// Material download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Transfer was interrupted mid-stream (recoverable)
    #[error("transfer of {url} interrupted: {reason}")]
    Interrupted {
        /// Source URL
        url: String,
        /// Underlying transport failure
        reason: String,
    },

    /// Server answered with a non-success status
    #[error("{url} answered with HTTP {status}")]
    Status {
        /// Source URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Connection, timeout or local write failure (not recoverable)
    #[error("failed to fetch {url}: {reason}")]
    Transport {
        /// Source URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// Every attempt ended in a recoverable interruption
    #[error("{url} failed after {attempts} attempts")]
    RetriesExhausted {
        /// Source URL
        url: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// Downloaded file failed size or media validation
    #[error("integrity check failed for {path}: {reason}")]
    Integrity {
        /// Local file that failed verification (already removed)
        path: PathBuf,
        /// Which check failed
        reason: String,
    },

    /// Download was cancelled because enough footage was collected
    #[error("download of {url} cancelled")]
    Cancelled {
        /// Source URL
        url: String,
    },
}

/// Pipeline stage failures
#[derive(Debug, Error)]
pub enum StageError {
    /// Script generation produced nothing
    #[error("failed to generate video script")]
    EmptyScript,

    /// Term extraction produced nothing
    #[error("failed to generate video terms")]
    EmptyTerms,

    /// Speech synthesis returned no result for a segment
    #[error("failed to synthesize {segment} audio")]
    Synthesis {
        /// Segment name ("main", "pre", "ad", "post")
        segment: &'static str,
    },

    /// No usable footage was collected
    #[error("no usable materials found")]
    NoMaterials,

    /// Ad mode is active but the ad asset could not be resolved
    #[error("ad material is missing or invalid")]
    AdMaterialUnavailable,

    /// Compositor failed for an output
    #[error("failed to compose video {index}: {reason}")]
    Composition {
        /// Output name ("1", "2", ..., or "ad")
        index: String,
        /// Compositor error
        reason: String,
    },
}

/// Task state store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// No task with this id
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// A task with this id already exists and is still running
    #[error("task {0} already exists")]
    AlreadyExists(TaskId),

    /// Task already reached a terminal state
    #[error("task {id} is already {state:?}")]
    Terminal {
        /// Task id
        id: TaskId,
        /// The terminal state
        state: TaskState,
    },

    /// Update would move progress backwards
    #[error("task {id} progress cannot go from {current} to {requested}")]
    ProgressRegression {
        /// Task id
        id: TaskId,
        /// Stored progress
        current: f64,
        /// Rejected progress
        requested: f64,
    },
}

impl Error {
    /// Machine-readable error code, recorded on failed tasks
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidParams(_) => "invalid_params",
            Error::Search(_) => "search_error",
            Error::Download(e) => match e {
                DownloadError::Interrupted { .. } => "download_interrupted",
                DownloadError::Status { .. } => "download_status",
                DownloadError::Transport { .. } => "download_transport",
                DownloadError::RetriesExhausted { .. } => "retries_exhausted",
                DownloadError::Integrity { .. } => "integrity_error",
                DownloadError::Cancelled { .. } => "cancelled",
            },
            Error::Stage(e) => match e {
                StageError::EmptyScript => "empty_script",
                StageError::EmptyTerms => "empty_terms",
                StageError::Synthesis { .. } => "synthesis_failed",
                StageError::NoMaterials => "no_materials",
                StageError::AdMaterialUnavailable => "ad_material_unavailable",
                StageError::Composition { .. } => "composition_failed",
            },
            Error::Store(_) => "store_error",
            Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
            Error::Other(_) => "internal_error",
        }
    }

    /// Stage failures are recorded on the task; everything else propagates
    pub fn is_stage_failure(&self) -> bool {
        matches!(self, Error::Stage(_))
    }

    /// Shorthand for a configuration error tied to a key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Stage that produced a failure, used when reporting it
pub(crate) fn failing_stage(err: &StageError) -> Stage {
    match err {
        StageError::EmptyScript => Stage::Script,
        StageError::EmptyTerms => Stage::Terms,
        StageError::Synthesis { .. } => Stage::Audio,
        StageError::NoMaterials | StageError::AdMaterialUnavailable => Stage::Materials,
        StageError::Composition { .. } => Stage::Video,
    }
}
