//! Audio and subtitle stages, including the ad-insertion split

use super::Pipeline;
use super::script::strip_marker;
use crate::config::SubtitleProvider;
use crate::error::{Result, StageError};
use crate::services::SpeechTiming;
use crate::types::{AdSegments, SegmentAudio, Task, TaskUpdate};
use crate::utils::remove_file_if_exists;
use std::path::{Path, PathBuf};

/// How a script is narrated
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScriptLayout {
    /// One narration for the whole script
    Single(String),
    /// Narration before and after the ad marker
    Split {
        /// Text before the first marker
        pre: String,
        /// Text after it
        post: String,
    },
}

/// Split at the first marker when ad mode is on; otherwise drop stray markers
pub(crate) fn layout(script: &str, marker: &str, ad_enabled: bool) -> ScriptLayout {
    if ad_enabled
        && !marker.is_empty()
        && let Some((pre, post)) = script.split_once(marker)
    {
        return ScriptLayout::Split {
            pre: pre.trim().to_string(),
            post: strip_marker(post, marker),
        };
    }
    ScriptLayout::Single(strip_marker(script, marker))
}

/// A synthesized segment, with the timing kept for subtitle generation
#[derive(Debug, Clone)]
pub(crate) struct SpokenSegment {
    /// "main", "pre", "ad" or "post"
    pub(crate) name: &'static str,
    pub(crate) text: String,
    pub(crate) audio_file: PathBuf,
    pub(crate) timing: SpeechTiming,
    /// Whole seconds, rounded up
    pub(crate) duration: u64,
}

/// All segments of a run's narration, in playback order
#[derive(Debug, Clone)]
pub(crate) struct Narration {
    pub(crate) segments: Vec<SpokenSegment>,
}

fn audio_name(segment: &str) -> String {
    match segment {
        "main" => "audio.mp3".to_string(),
        name => format!("audio-{}.mp3", name),
    }
}

fn subtitle_name(segment: &str) -> String {
    match segment {
        "main" => "subtitle.srt".to_string(),
        name => format!("subtitle-{}.srt", name),
    }
}

impl Pipeline {
    /// Synthesize the narration, split into pre/ad/post segments in ad mode
    pub(super) async fn audio_stage(&self, dir: &Path, task: &Task) -> Result<(Narration, TaskUpdate)> {
        let params = &task.params;
        let script = task.script.as_deref().unwrap_or_default();

        match layout(script, &self.config.ad.marker, params.ad_enabled) {
            ScriptLayout::Single(text) => {
                let main = self.speak(dir, task, "main", &text).await?;
                let update = TaskUpdate {
                    audio_file: Some(main.audio_file.clone()),
                    total_duration: Some(main.duration),
                    ..Default::default()
                };
                Ok((Narration { segments: vec![main] }, update))
            }
            ScriptLayout::Split { pre, post } => {
                tracing::info!(task_id = %task.id, "ad marker found, narrating three segments");
                let pre = self.speak(dir, task, "pre", &pre).await?;
                let ad = self.speak(dir, task, "ad", params.ad_script.trim()).await?;
                let post = self.speak(dir, task, "post", &post).await?;

                let segment = |s: &SpokenSegment| SegmentAudio {
                    audio_file: s.audio_file.clone(),
                    subtitle_path: None,
                    duration: s.duration,
                };
                let update = TaskUpdate {
                    total_duration: Some(pre.duration + ad.duration + post.duration),
                    pre_ad_duration: Some(pre.duration),
                    ad_duration: Some(ad.duration),
                    post_ad_duration: Some(post.duration),
                    ad_segments: Some(AdSegments {
                        pre: segment(&pre),
                        ad: segment(&ad),
                        post: segment(&post),
                    }),
                    ..Default::default()
                };
                Ok((
                    Narration {
                        segments: vec![pre, ad, post],
                    },
                    update,
                ))
            }
        }
    }

    async fn speak(
        &self,
        dir: &Path,
        task: &Task,
        name: &'static str,
        text: &str,
    ) -> Result<SpokenSegment> {
        if text.trim().is_empty() {
            tracing::error!(task_id = %task.id, segment = name, "nothing to narrate");
            return Err(StageError::Synthesis { segment: name }.into());
        }

        let params = &task.params;
        let output = dir.join(audio_name(name));
        let speech = &self.services.speech;

        let result = match speech
            .synthesize(text, &params.voice_name, params.voice_rate, &output)
            .await
        {
            Ok(Some(result)) => result,
            Ok(None) => {
                tracing::error!(
                    task_id = %task.id,
                    segment = name,
                    voice = %params.voice_name,
                    "failed to generate audio, check that the voice matches the script language"
                );
                return Err(StageError::Synthesis { segment: name }.into());
            }
            Err(e) => {
                tracing::error!(task_id = %task.id, segment = name, error = %e, "failed to generate audio");
                return Err(StageError::Synthesis { segment: name }.into());
            }
        };

        let duration = speech.audio_duration(&result.timing).max(0.0).ceil() as u64;
        tracing::info!(task_id = %task.id, segment = name, duration, "audio generated");

        Ok(SpokenSegment {
            name,
            text: text.to_string(),
            audio_file: result.audio_file,
            timing: result.timing,
            duration,
        })
    }

    /// Generate subtitles for every narration segment; never fails the run
    pub(super) async fn subtitle_stage(
        &self,
        dir: &Path,
        task: &Task,
        narration: &Narration,
    ) -> TaskUpdate {
        if !task.params.subtitle_enabled {
            tracing::info!(task_id = %task.id, "subtitles disabled");
            return TaskUpdate::default();
        }

        let mut paths = Vec::with_capacity(narration.segments.len());
        for segment in &narration.segments {
            paths.push(self.subtitle_for(dir, task, segment).await);
        }

        match &task.ad_segments {
            Some(segments) => {
                let mut segments = segments.clone();
                let mut paths = paths.into_iter();
                segments.pre.subtitle_path = paths.next().flatten();
                segments.ad.subtitle_path = paths.next().flatten();
                segments.post.subtitle_path = paths.next().flatten();
                TaskUpdate {
                    ad_segments: Some(segments),
                    ..Default::default()
                }
            }
            None => TaskUpdate {
                subtitle_path: paths.into_iter().next().flatten(),
                ..Default::default()
            },
        }
    }

    async fn subtitle_for(&self, dir: &Path, task: &Task, segment: &SpokenSegment) -> Option<PathBuf> {
        let output = dir.join(subtitle_name(segment.name));
        remove_file_if_exists(&output).await;

        let subtitles = &self.services.subtitles;
        let provider = self.config.subtitle.provider;
        tracing::info!(task_id = %task.id, segment = segment.name, provider = ?provider, "generating subtitle");

        let mut fallback = false;
        if provider == SubtitleProvider::Edge {
            if let Err(e) = subtitles
                .from_timing(&segment.text, &segment.timing, &output)
                .await
            {
                tracing::warn!(segment = segment.name, error = %e, "timing-based subtitles failed");
            }
            if !output.is_file() {
                tracing::warn!(segment = segment.name, "subtitle file not found, falling back to transcription");
                fallback = true;
            }
        }

        if provider == SubtitleProvider::Whisper || fallback {
            if let Err(e) = subtitles.transcribe(&segment.audio_file, &output).await {
                tracing::warn!(segment = segment.name, error = %e, "subtitle transcription failed");
                return None;
            }
            if let Err(e) = subtitles.correct(&output, &segment.text).await {
                tracing::warn!(segment = segment.name, error = %e, "subtitle correction failed");
            }
        }

        if subtitle_file_is_valid(&output).await {
            Some(output)
        } else {
            tracing::warn!(path = %output.display(), "subtitle file is invalid");
            None
        }
    }
}

/// A subtitle file is usable when it has at least one timed cue
pub(crate) async fn subtitle_file_is_valid(path: &Path) -> bool {
    tokio::fs::read_to_string(path)
        .await
        .map(|content| content.contains("-->"))
        .unwrap_or(false)
}
