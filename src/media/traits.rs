//! Traits and types for media inspection

use async_trait::async_trait;
use std::path::Path;

/// Capabilities of a media probe implementation
#[derive(Debug, Clone, Copy)]
pub struct ProbeCapabilities {
    /// Can check that a file decodes cleanly
    pub can_validate: bool,
    /// Can measure duration
    pub can_measure: bool,
}

/// Trait for media file inspection
///
/// Implementations can shell out to external binaries or provide stub
/// functionality. Unsupported operations return `Error::NotSupported` so
/// callers can degrade gracefully.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Check that the file is a decodable media container
    ///
    /// Returns `Ok(false)` when the decoder reports any error.
    async fn validate(&self, path: &Path) -> crate::Result<bool>;

    /// Duration of the file in seconds
    async fn duration(&self, path: &Path) -> crate::Result<f64>;

    /// Query capabilities of this probe
    fn capabilities(&self) -> ProbeCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
