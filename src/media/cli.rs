//! CLI-based media probe using external ffmpeg/ffprobe binaries

use super::traits::{MediaProbe, ProbeCapabilities};
use crate::config::ToolsConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// CLI-based media probe
///
/// Validation runs a full decode to a null muxer (`ffmpeg -v error -i <file>
/// -f null -`) and accepts the file only if the decoder exits cleanly without
/// writing anything to stderr. Duration comes from `ffprobe`'s container
/// metadata. Both run as child processes so they never block the runtime.
pub struct CliMediaProbe {
    ffmpeg_path: Option<PathBuf>,
    ffprobe_path: Option<PathBuf>,
}

impl CliMediaProbe {
    /// Create a probe with explicit binary paths
    pub fn new(ffmpeg_path: Option<PathBuf>, ffprobe_path: Option<PathBuf>) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    /// Attempt to find ffmpeg and ffprobe in PATH
    pub fn from_path() -> Self {
        Self::new(which::which("ffmpeg").ok(), which::which("ffprobe").ok())
    }

    /// Explicit paths from config, then PATH search if enabled
    pub fn from_config(tools: &ToolsConfig) -> Self {
        let lookup = |explicit: &Option<PathBuf>, name: &str| -> Option<PathBuf> {
            explicit
                .clone()
                .or_else(|| tools.search_path.then(|| which::which(name).ok()).flatten())
        };
        Self::new(
            lookup(&tools.ffmpeg_path, "ffmpeg"),
            lookup(&tools.ffprobe_path, "ffprobe"),
        )
    }
}

#[async_trait]
impl MediaProbe for CliMediaProbe {
    async fn validate(&self, path: &Path) -> crate::Result<bool> {
        let ffmpeg = self.ffmpeg_path.as_ref().ok_or_else(|| {
            crate::Error::NotSupported("ffmpeg binary not available".into())
        })?;

        let output = Command::new(ffmpeg)
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(path)
            .arg("-f")
            .arg("null")
            .arg("-")
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let clean = output.status.success() && stderr.trim().is_empty();
        if !clean {
            tracing::debug!(
                path = %path.display(),
                exit_code = ?output.status.code(),
                stderr = %stderr.trim(),
                "media validation reported errors"
            );
        }
        Ok(clean)
    }

    async fn duration(&self, path: &Path) -> crate::Result<f64> {
        let ffprobe = self.ffprobe_path.as_ref().ok_or_else(|| {
            crate::Error::NotSupported("ffprobe binary not available".into())
        })?;

        let output = Command::new(ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                crate::Error::ExternalTool(format!("Failed to execute ffprobe: {}", e))
            })?;

        if !output.status.success() {
            return Err(crate::Error::ExternalTool(format!(
                "ffprobe exited with status {:?} while probing {}",
                output.status.code(),
                path.display()
            )));
        }

        parse_duration_output(&output.stdout).ok_or_else(|| {
            crate::Error::ExternalTool(format!(
                "ffprobe returned no duration for {}",
                path.display()
            ))
        })
    }

    fn capabilities(&self) -> ProbeCapabilities {
        ProbeCapabilities {
            can_validate: self.ffmpeg_path.is_some(),
            can_measure: self.ffprobe_path.is_some(),
        }
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}

/// First parseable, finite, non-negative number in ffprobe's output
fn parse_duration_output(stdout: &[u8]) -> Option<f64> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .find(|d| d.is_finite() && *d >= 0.0)
}
