//! Composition stage

use super::{Pipeline, Run};
use crate::error::{Error, Result, StageError};
use crate::services::{AdInsert, CombineRequest, RenderRequest};
use crate::types::{AdSegments, ConcatMode, Task, TaskUpdate};
use std::path::PathBuf;

fn composition(index: impl ToString, e: Error) -> Error {
    StageError::Composition {
        index: index.to_string(),
        reason: e.to_string(),
    }
    .into()
}

/// Clip cap for the ad segment, saturating at `u32::MAX`
pub(super) fn ad_clip_limit(seconds: u64) -> u32 {
    u32::try_from(seconds.max(1)).unwrap_or(u32::MAX)
}

impl Pipeline {
    /// Render the ad segment once, then every requested output
    ///
    /// Progress advances twice per output, after the combine and after the
    /// render, splitting the remaining half of the bar evenly.
    pub(super) async fn video_stage(&self, run: &Run, task: &Task) -> Result<TaskUpdate> {
        let params = &task.params;
        let count = params.video_count.max(1);
        let concat_mode = if count > 1 {
            ConcatMode::Random
        } else {
            params.video_concat_mode
        };

        let ad_video = match &task.ad_segments {
            Some(segments) => Some(self.render_ad(run, task, segments).await?),
            None => None,
        };

        let (audio_files, subtitle_files, ad_insert) = match (&task.ad_segments, &ad_video) {
            (Some(segments), Some(video)) => (
                vec![
                    segments.pre.audio_file.clone(),
                    segments.post.audio_file.clone(),
                ],
                vec![
                    segments.pre.subtitle_path.clone(),
                    segments.post.subtitle_path.clone(),
                ],
                Some(AdInsert {
                    video_path: video.clone(),
                    after_seconds: segments.pre.duration,
                }),
            ),
            _ => {
                let audio = task
                    .audio_file
                    .clone()
                    .ok_or_else(|| Error::Other("narration audio missing".into()))?;
                (vec![audio], vec![task.subtitle_path.clone()], None)
            }
        };

        let step = 50.0 / count as f64 / 2.0;
        let mut progress = task.progress;
        let mut combined_videos = Vec::with_capacity(count as usize);
        let mut videos = Vec::with_capacity(count as usize);

        for index in 1..=count {
            tracing::info!(task_id = %task.id, index, count, "combining video");
            let combined = self
                .services
                .compositor
                .combine(CombineRequest {
                    clip_paths: task.material_urls.clone(),
                    audio_files: audio_files.clone(),
                    output: run.dir.join(format!("combined-{}.mp4", index)),
                    aspect: params.video_aspect,
                    concat_mode,
                    max_clip_duration: params.video_clip_duration,
                    threads: params.n_threads,
                })
                .await
                .map_err(|e| composition(index, e))?;
            progress += step;
            self.commit(&run.id, TaskUpdate::progress(progress)).await?;

            tracing::info!(task_id = %task.id, index, count, "rendering video");
            let video = self
                .services
                .compositor
                .generate_video(RenderRequest {
                    clip_path: combined.clone(),
                    audio_files: audio_files.clone(),
                    subtitle_files: subtitle_files.clone(),
                    output: run.dir.join(format!("final-{}.mp4", index)),
                    ad_insert: ad_insert.clone(),
                    render: params.render.clone(),
                })
                .await
                .map_err(|e| composition(index, e))?;
            progress += step;
            self.commit(&run.id, TaskUpdate::progress(progress)).await?;

            combined_videos.push(combined);
            videos.push(video);
        }

        Ok(TaskUpdate {
            combined_videos: Some(combined_videos),
            videos: Some(videos),
            ad_video,
            ..Default::default()
        })
    }

    async fn render_ad(&self, run: &Run, task: &Task, segments: &AdSegments) -> Result<PathBuf> {
        let params = &task.params;
        let material = task
            .ad_material_info
            .as_ref()
            .ok_or(StageError::AdMaterialUnavailable)?;
        tracing::info!(task_id = %task.id, "rendering ad segment");

        let combined = self
            .services
            .compositor
            .combine(CombineRequest {
                clip_paths: vec![PathBuf::from(&material.url)],
                audio_files: vec![segments.ad.audio_file.clone()],
                output: run.dir.join("combined-ad.mp4"),
                aspect: params.video_aspect,
                concat_mode: ConcatMode::Sequential,
                max_clip_duration: ad_clip_limit(segments.ad.duration),
                threads: params.n_threads,
            })
            .await
            .map_err(|e| composition("ad", e))?;

        self.services
            .compositor
            .generate_video(RenderRequest {
                clip_path: combined,
                audio_files: vec![segments.ad.audio_file.clone()],
                subtitle_files: vec![segments.ad.subtitle_path.clone()],
                output: run.dir.join("ad.mp4"),
                ad_insert: None,
                render: params.render.clone(),
            })
            .await
            .map_err(|e| composition("ad", e))
    }
}
