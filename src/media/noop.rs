//! No-op media probe for graceful degradation

use super::traits::{MediaProbe, ProbeCapabilities};
use async_trait::async_trait;
use std::path::Path;

/// Media probe used when ffmpeg/ffprobe are unavailable
///
/// Every operation returns `Error::NotSupported`. The downloader then skips
/// decode validation and acquisition falls back to provider-reported durations.
pub struct NoOpMediaProbe;

#[async_trait]
impl MediaProbe for NoOpMediaProbe {
    async fn validate(&self, _path: &Path) -> crate::Result<bool> {
        Err(crate::Error::NotSupported(
            "media validation requires the ffmpeg binary. \
             Configure ffmpeg_path or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    async fn duration(&self, _path: &Path) -> crate::Result<f64> {
        Err(crate::Error::NotSupported(
            "duration probing requires the ffprobe binary. \
             Configure ffprobe_path or ensure ffprobe is in PATH."
                .into(),
        ))
    }

    fn capabilities(&self) -> ProbeCapabilities {
        ProbeCapabilities {
            can_validate: false,
            can_measure: false,
        }
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
