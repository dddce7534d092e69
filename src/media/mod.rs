//! Media inspection for downloaded and local footage
//!
//! The [`MediaProbe`] trait covers the two questions the pipeline asks about a
//! media file: is it a decodable container, and how long is it.
//!
//! - [`CliMediaProbe`]: uses external `ffmpeg` / `ffprobe` binaries
//! - [`NoOpMediaProbe`]: stub when neither binary is available
//!
//! ## Usage
//!
//! ```no_run
//! use autoreel::media::{CliMediaProbe, MediaProbe};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let probe = CliMediaProbe::from_path();
//!     if probe.validate(Path::new("clip.mp4")).await? {
//!         println!("{} seconds", probe.duration(Path::new("clip.mp4")).await?);
//!     }
//!     Ok(())
//! }
//! ```

mod cli;
mod noop;
mod traits;

pub use cli::CliMediaProbe;
pub use noop::NoOpMediaProbe;
pub use traits::{MediaProbe, ProbeCapabilities};

use crate::config::ToolsConfig;
use std::sync::Arc;

/// Build the media probe described by the tools configuration
///
/// Falls back to [`NoOpMediaProbe`] when no binary is configured or found.
pub fn probe_from_config(tools: &ToolsConfig) -> Arc<dyn MediaProbe> {
    let probe = CliMediaProbe::from_config(tools);
    let caps = probe.capabilities();
    if !caps.can_validate && !caps.can_measure {
        tracing::warn!("ffmpeg/ffprobe not found, media validation and probing disabled");
        return Arc::new(NoOpMediaProbe);
    }
    tracing::info!(
        media_probe = probe.name(),
        can_validate = caps.can_validate,
        can_measure = caps.can_measure,
        "media probe initialized"
    );
    Arc::new(probe)
}
