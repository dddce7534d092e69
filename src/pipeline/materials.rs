//! Footage stage

use super::Pipeline;
use crate::error::{Result, StageError};
use crate::material::{AcquisitionRequest, preprocess_local};
use crate::types::{Task, TaskUpdate, VideoSource};
use std::path::PathBuf;

impl Pipeline {
    /// Resolve the ad asset (in ad mode) and collect the main footage
    pub(super) async fn materials_stage(&self, task: &Task) -> Result<TaskUpdate> {
        let params = &task.params;
        let clip = params.video_clip_duration as f64;
        let mut update = TaskUpdate::default();

        if task.ad_mode() {
            let ad = params
                .ad_material
                .as_ref()
                .ok_or(StageError::AdMaterialUnavailable)?;
            let resolved =
                preprocess_local(std::slice::from_ref(ad), 0.0, clip, self.probe.as_ref()).await;
            let ad = resolved
                .into_iter()
                .next()
                .ok_or(StageError::AdMaterialUnavailable)?;
            tracing::info!(task_id = %task.id, ad = %ad.url, "ad material resolved");
            update.ad_material_info = Some(ad);
        }

        let paths = match params.video_source {
            VideoSource::Local => {
                let materials =
                    preprocess_local(&params.video_materials, clip, clip, self.probe.as_ref())
                        .await;
                if materials.is_empty() {
                    return Err(StageError::NoMaterials.into());
                }
                materials.into_iter().map(|m| PathBuf::from(m.url)).collect()
            }
            source => {
                let provider = self.providers.get(source).await?;
                let target =
                    task.total_duration.unwrap_or_default() as f64 * params.video_count.max(1) as f64;
                tracing::info!(
                    task_id = %task.id,
                    provider = provider.name(),
                    target_duration = target,
                    "collecting footage"
                );
                self.acquirer
                    .acquire(
                        provider,
                        AcquisitionRequest {
                            task_id: &task.id,
                            search_terms: &task.search_terms,
                            aspect: params.video_aspect,
                            concat_mode: params.video_concat_mode,
                            target_duration: target,
                            max_clip_duration: clip,
                        },
                    )
                    .await?
            }
        };

        tracing::info!(task_id = %task.id, count = paths.len(), "materials ready");
        update.material_urls = Some(paths);
        Ok(update)
    }
}
