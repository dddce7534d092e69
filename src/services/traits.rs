//! Collaborator contracts and the request/response types they exchange

use crate::types::{ConcatMode, RenderSettings, VideoAspect};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One spoken word (or phrase) with its position in the synthesized audio
#[derive(Debug, Clone, PartialEq)]
pub struct WordBoundary {
    /// Spoken text
    pub text: String,
    /// Offset from the start of the audio
    pub offset: Duration,
    /// How long the text is spoken
    pub duration: Duration,
}

/// Timing metadata produced alongside synthesized speech
///
/// Opaque to the pipeline: it is only handed back to the synthesizer (for the
/// duration) and to the subtitle generator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechTiming {
    /// Word boundaries in playback order
    pub boundaries: Vec<WordBoundary>,
}

impl SpeechTiming {
    /// End of the last boundary, or zero when there is none
    pub fn end(&self) -> Duration {
        self.boundaries
            .iter()
            .map(|b| b.offset + b.duration)
            .max()
            .unwrap_or_default()
    }
}

/// Output of a successful synthesis
#[derive(Debug, Clone)]
pub struct SpeechResult {
    /// Audio file that was written
    pub audio_file: PathBuf,
    /// Timing metadata for subtitles and duration
    pub timing: SpeechTiming,
}

/// Intermediate clip request: cut and join footage to the narration length
#[derive(Debug, Clone)]
pub struct CombineRequest {
    /// Footage in composition order
    pub clip_paths: Vec<PathBuf>,
    /// Narration the clip must cover (played back to back)
    pub audio_files: Vec<PathBuf>,
    /// Where to write the combined clip
    pub output: PathBuf,
    /// Output aspect ratio
    pub aspect: VideoAspect,
    /// Clip ordering
    pub concat_mode: ConcatMode,
    /// Seconds taken from each clip at most
    pub max_clip_duration: u32,
    /// Encoder thread hint
    pub threads: u32,
}

/// Ad segment spliced into a final video
#[derive(Debug, Clone, PartialEq)]
pub struct AdInsert {
    /// Rendered ad segment
    pub video_path: PathBuf,
    /// Splice point in seconds from the start of the narration
    pub after_seconds: u64,
}

/// Final render request: clip + narration + subtitles
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Combined clip
    pub clip_path: PathBuf,
    /// Narration (played back to back)
    pub audio_files: Vec<PathBuf>,
    /// Subtitle file for each entry of `audio_files`, `None` where there is none
    pub subtitle_files: Vec<Option<PathBuf>>,
    /// Where to write the final video
    pub output: PathBuf,
    /// Ad segment to splice, if any
    pub ad_insert: Option<AdInsert>,
    /// Font, colors, volumes, background music
    pub render: RenderSettings,
}

/// Script and search-term generation (language model)
///
/// An empty result is a failure, same as an error.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Narration script for a subject
    async fn generate_script(
        &self,
        subject: &str,
        language: &str,
        paragraph_number: u32,
    ) -> crate::Result<String>;

    /// Footage search terms for a script
    async fn generate_terms(
        &self,
        subject: &str,
        script: &str,
        amount: usize,
    ) -> crate::Result<Vec<String>>;
}

/// Text-to-speech synthesis
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into `output`
    ///
    /// `Ok(None)` means the engine produced nothing.
    async fn synthesize(
        &self,
        text: &str,
        voice_name: &str,
        rate: f64,
        output: &Path,
    ) -> crate::Result<Option<SpeechResult>>;

    /// Length of the synthesized audio in seconds
    fn audio_duration(&self, timing: &SpeechTiming) -> f64 {
        timing.end().as_secs_f64()
    }
}

/// Subtitle generation, always best effort
#[async_trait]
pub trait SubtitleGenerator: Send + Sync {
    /// Build subtitles from synthesis timing
    async fn from_timing(&self, text: &str, timing: &SpeechTiming, output: &Path)
    -> crate::Result<()>;

    /// Build subtitles by transcribing the audio
    async fn transcribe(&self, audio_file: &Path, output: &Path) -> crate::Result<()>;

    /// Align a transcribed subtitle file with the known script
    async fn correct(&self, subtitle_file: &Path, script: &str) -> crate::Result<()>;
}

/// Video compositing engine
#[async_trait]
pub trait Compositor: Send + Sync {
    /// Cut and join footage into one clip covering the narration
    async fn combine(&self, request: CombineRequest) -> crate::Result<PathBuf>;

    /// Render the final video
    async fn generate_video(&self, request: RenderRequest) -> crate::Result<PathBuf>;
}
