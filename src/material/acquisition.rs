//! Collecting enough downloaded footage to cover the narration

use super::downloader::MaterialDownloader;
use crate::config::Config;
use crate::error::{DownloadError, Error, Result, StageError};
use crate::media::MediaProbe;
use crate::providers::FootageProvider;
use crate::types::{ConcatMode, MaterialInfo, TaskId, VideoAspect};
use crate::utils::{material_file_name, resolve_material_dir};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What one acquisition has to collect
#[derive(Debug, Clone)]
pub struct AcquisitionRequest<'a> {
    /// Task the footage is for (selects the task directory)
    pub task_id: &'a TaskId,
    /// Search terms, in order
    pub search_terms: &'a [String],
    /// Output aspect ratio
    pub aspect: VideoAspect,
    /// Clip ordering
    pub concat_mode: ConcatMode,
    /// Seconds of usable footage to collect
    pub target_duration: f64,
    /// Seconds used from each clip; shorter clips are skipped
    pub max_clip_duration: f64,
}

/// Searches, downloads and selects footage for a task
pub struct MaterialAcquirer {
    config: Arc<Config>,
    downloader: Arc<MaterialDownloader>,
    probe: Arc<dyn MediaProbe>,
}

impl MaterialAcquirer {
    /// Create an acquirer sharing the pipeline's downloader and probe
    pub fn new(
        config: Arc<Config>,
        downloader: Arc<MaterialDownloader>,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        Self {
            config,
            downloader,
            probe,
        }
    }

    /// Run an acquisition and return the selected local files in order
    ///
    /// Every candidate is downloaded concurrently (bounded by the download
    /// pool) and results are examined in submission order. Once the collected
    /// duration reaches the target, the remaining downloads are cancelled
    /// unless `material.eager_cancel` is off, in which case they are allowed
    /// to finish.
    ///
    /// # Errors
    ///
    /// `StageError::NoMaterials` if nothing usable was collected.
    pub async fn acquire(
        &self,
        provider: &FootageProvider,
        request: AcquisitionRequest<'_>,
    ) -> Result<Vec<PathBuf>> {
        let mut candidates = Vec::new();
        for term in request.search_terms {
            let items = provider
                .search(term, request.max_clip_duration, request.aspect)
                .await;
            tracing::info!(term = %term, found = items.len(), "found videos");
            candidates.extend(items);
        }

        let candidates = dedupe(order_candidates(candidates, request.concat_mode));
        let dir = resolve_material_dir(&self.config, request.task_id);

        tracing::info!(
            task_id = %request.task_id,
            provider = provider.name(),
            candidates = candidates.len(),
            target_duration = request.target_duration,
            dir = %dir.display(),
            "downloading materials"
        );

        let selected = self.download_and_select(&candidates, &dir, &request).await;
        if selected.is_empty() {
            return Err(Error::Stage(StageError::NoMaterials));
        }
        Ok(selected)
    }

    async fn download_and_select(
        &self,
        candidates: &[MaterialInfo],
        dir: &Path,
        request: &AcquisitionRequest<'_>,
    ) -> Vec<PathBuf> {
        let cancel = CancellationToken::new();
        let handles: Vec<_> = candidates
            .iter()
            .map(|info| {
                let downloader = Arc::clone(&self.downloader);
                let url = info.url.clone();
                let dir = dir.to_path_buf();
                let cancel = cancel.clone();
                tokio::spawn(async move { downloader.fetch(&url, &dir, &cancel).await })
            })
            .collect();

        let mut selected = Vec::new();
        let mut total = 0.0;
        let mut pending = candidates.iter().zip(handles);

        for (info, handle) in pending.by_ref() {
            let path = match handle.await {
                Ok(Ok(path)) => path,
                Ok(Err(e)) => {
                    log_failed_download(&info.url, &e);
                    continue;
                }
                Err(e) => {
                    tracing::error!(url = %info.url, error = %e, "download task panicked");
                    continue;
                }
            };

            let Some(duration) = self.clip_duration(&path, info).await else {
                continue;
            };
            if duration < request.max_clip_duration {
                tracing::debug!(path = %path.display(), duration, "clip too short, skipped");
                continue;
            }

            total += request.max_clip_duration.min(duration);
            selected.push(path);
            if total >= request.target_duration {
                break;
            }
        }

        let remaining: Vec<_> = pending.map(|(_, handle)| handle).collect();
        if !remaining.is_empty() {
            if self.config.material.eager_cancel {
                tracing::info!(cancelled = remaining.len(), "target reached, cancelling remaining downloads");
                cancel.cancel();
            }
            // Wait so cancelled transfers have removed their partial files
            futures::future::join_all(remaining).await;
        }

        tracing::info!(
            task_id = %request.task_id,
            selected = selected.len(),
            total_duration = total,
            "materials collected"
        );
        selected
    }

    /// Probed duration, falling back to the provider's figure when probing is
    /// unavailable; `None` if the file cannot be measured
    async fn clip_duration(&self, path: &Path, info: &MaterialInfo) -> Option<f64> {
        match self.probe.duration(path).await {
            Ok(d) => Some(d),
            Err(Error::NotSupported(_)) => Some(info.duration),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read clip duration, skipped");
                None
            }
        }
    }
}

fn log_failed_download(url: &str, e: &DownloadError) {
    match e {
        DownloadError::Cancelled { .. } => tracing::debug!(url, "download cancelled"),
        _ => tracing::warn!(url, error = %e, "material download failed"),
    }
}

/// Shuffle for random concat mode, keep discovery order otherwise
pub(crate) fn order_candidates(
    mut candidates: Vec<MaterialInfo>,
    mode: ConcatMode,
) -> Vec<MaterialInfo> {
    if mode == ConcatMode::Random {
        candidates.shuffle(&mut rand::thread_rng());
    }
    candidates
}

/// Drop later candidates that map to the same cache file
fn dedupe(candidates: Vec<MaterialInfo>) -> Vec<MaterialInfo> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(material_file_name(&c.url)))
        .collect()
}
