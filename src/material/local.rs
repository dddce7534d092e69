//! Caller-supplied local footage

use crate::error::Error;
use crate::media::MediaProbe;
use crate::types::{MaterialInfo, MaterialProvider};
use crate::utils::{is_image, is_video};
use std::path::{Path, PathBuf};

/// Validate local materials and resolve them to usable files
///
/// Directories are expanded to the media files they contain, in name order.
/// Images become still clips lasting `image_duration`. Videos are probed and
/// dropped when shorter than `min_duration`; without a working probe the
/// caller-supplied duration is trusted, and an unknown duration is accepted.
/// Missing files and unsupported formats are skipped.
pub async fn preprocess_local(
    materials: &[MaterialInfo],
    min_duration: f64,
    image_duration: f64,
    probe: &dyn MediaProbe,
) -> Vec<MaterialInfo> {
    let mut files = Vec::new();
    for material in materials {
        let path = PathBuf::from(material.url.trim());
        if path.is_dir() {
            files.extend(expand_dir(&path).await.into_iter().map(|p| (p, 0.0)));
        } else {
            files.push((path, material.duration));
        }
    }

    let mut usable = Vec::new();
    for (path, declared) in files {
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "local material not found, skipped");
            continue;
        }

        let duration = if is_image(&path) {
            image_duration
        } else if is_video(&path) {
            match probe.duration(&path).await {
                Ok(d) => d,
                Err(Error::NotSupported(_)) if declared > 0.0 => declared,
                Err(Error::NotSupported(_)) => image_duration.max(min_duration),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot probe local material, skipped");
                    continue;
                }
            }
        } else {
            tracing::warn!(path = %path.display(), "unsupported local material format, skipped");
            continue;
        };

        if duration < min_duration {
            tracing::warn!(
                path = %path.display(),
                duration,
                min_duration,
                "local material too short, skipped"
            );
            continue;
        }

        usable.push(MaterialInfo {
            provider: MaterialProvider::Local,
            url: path.display().to_string(),
            duration,
            search_term: None,
        });
    }
    usable
}

async fn expand_dir(dir: &Path) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot read material directory");
            return vec![];
        }
    };

    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.is_file() && (is_image(&path) || is_video(&path)) {
            files.push(path);
        }
    }
    files.sort();
    files
}
