//! Core types for autoreel

use crate::error::{Error, Result, StoreError};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Unique identifier for a production task
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a TaskId from a caller-supplied value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random TaskId
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Created, not started
    #[default]
    Pending,
    /// Stages are running
    Processing,
    /// Finished (fully or at the requested stop stage)
    Complete,
    /// A stage failed
    Failed,
}

impl TaskState {
    /// Complete and Failed never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Complete | TaskState::Failed)
    }

    /// Convert integer state code to TaskState
    pub fn from_i32(state: i32) -> Self {
        match state {
            0 => TaskState::Pending,
            1 => TaskState::Processing,
            2 => TaskState::Complete,
            _ => TaskState::Failed,
        }
    }

    /// Convert TaskState to integer state code
    pub fn to_i32(&self) -> i32 {
        match self {
            TaskState::Pending => 0,
            TaskState::Processing => 1,
            TaskState::Complete => 2,
            TaskState::Failed => 3,
        }
    }
}

/// Pipeline stage, also used as the `stop_at` selector
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Script generation
    Script,
    /// Search term extraction
    Terms,
    /// Speech synthesis
    Audio,
    /// Subtitle generation
    Subtitle,
    /// Footage acquisition
    Materials,
    /// Composition (the full run)
    #[default]
    Video,
}

impl Stage {
    /// Lowercase stage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Script => "script",
            Stage::Terms => "terms",
            Stage::Audio => "audio",
            Stage::Subtitle => "subtitle",
            Stage::Materials => "materials",
            Stage::Video => "video",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "script" => Ok(Stage::Script),
            "terms" => Ok(Stage::Terms),
            "audio" => Ok(Stage::Audio),
            "subtitle" => Ok(Stage::Subtitle),
            "materials" => Ok(Stage::Materials),
            "video" => Ok(Stage::Video),
            other => Err(Error::InvalidParams(format!("unknown stop stage '{other}'"))),
        }
    }
}

/// Output aspect ratio
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoAspect {
    /// 9:16
    #[default]
    #[serde(rename = "9:16", alias = "portrait")]
    Portrait,
    /// 16:9
    #[serde(rename = "16:9", alias = "landscape")]
    Landscape,
    /// 1:1
    #[serde(rename = "1:1", alias = "square")]
    Square,
}

impl VideoAspect {
    /// Target (width, height) in pixels
    pub fn to_resolution(&self) -> (u32, u32) {
        match self {
            VideoAspect::Portrait => (1080, 1920),
            VideoAspect::Landscape => (1920, 1080),
            VideoAspect::Square => (1080, 1080),
        }
    }

    /// Orientation name understood by stock-footage providers
    pub fn orientation(&self) -> &'static str {
        match self {
            VideoAspect::Portrait => "portrait",
            VideoAspect::Landscape => "landscape",
            VideoAspect::Square => "square",
        }
    }
}

/// Clip ordering policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcatMode {
    /// Shuffle clips
    #[default]
    Random,
    /// Keep discovery order
    Sequential,
}

/// Where footage comes from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoSource {
    /// Pexels video search
    #[default]
    Pexels,
    /// Pixabay video search
    Pixabay,
    /// Caller-supplied local files
    Local,
}

/// Provider tag carried by a [`MaterialInfo`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialProvider {
    /// Found via Pexels
    Pexels,
    /// Found via Pixabay
    Pixabay,
    /// Local file
    #[default]
    Local,
}

/// A candidate or resolved piece of footage
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    /// Where the footage came from
    #[serde(default)]
    pub provider: MaterialProvider,
    /// Remote URL or local path
    pub url: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration: f64,
    /// Search term the candidate was found for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
}

impl MaterialInfo {
    /// Local material with unknown duration
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            provider: MaterialProvider::Local,
            url: path.into(),
            duration: 0.0,
            search_term: None,
        }
    }
}

/// Caller-supplied search terms: a comma separated string or a list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VideoTerms {
    /// "a, b, c" (ASCII or full-width commas)
    Text(String),
    /// ["a", "b", "c"]
    List(Vec<String>),
}

fn term_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    SEPARATOR.get_or_init(|| Regex::new(r"[,，]").expect("term separator pattern is valid"))
}

impl VideoTerms {
    /// Normalized list of terms (trimmed, blanks dropped)
    pub fn to_terms(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            VideoTerms::Text(text) => term_separator().split(text).collect(),
            VideoTerms::List(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Render settings passed through to the compositor untouched
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Subtitle font file name
    #[serde(default = "default_font_name")]
    pub font_name: String,
    /// Subtitle font size
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Subtitle text color
    #[serde(default = "default_text_color")]
    pub text_fore_color: String,
    /// Subtitle stroke color
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    /// Subtitle stroke width
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    /// "top", "center" or "bottom"
    #[serde(default = "default_subtitle_position")]
    pub subtitle_position: String,
    /// Background music file, if any
    #[serde(default)]
    pub bgm_file: Option<PathBuf>,
    /// Background music volume
    #[serde(default = "default_bgm_volume")]
    pub bgm_volume: f64,
    /// Narration volume
    #[serde(default = "default_voice_volume")]
    pub voice_volume: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            font_name: default_font_name(),
            font_size: default_font_size(),
            text_fore_color: default_text_color(),
            stroke_color: default_stroke_color(),
            stroke_width: default_stroke_width(),
            subtitle_position: default_subtitle_position(),
            bgm_file: None,
            bgm_volume: default_bgm_volume(),
            voice_volume: default_voice_volume(),
        }
    }
}

/// Immutable input configuration of one production run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoParams {
    /// Topic of the video
    pub video_subject: String,
    /// Pre-supplied script (generated when empty)
    #[serde(default)]
    pub video_script: String,
    /// Pre-supplied search terms (generated when absent)
    #[serde(default)]
    pub video_terms: Option<VideoTerms>,
    /// Script language hint for the generator
    #[serde(default)]
    pub video_language: String,
    /// Paragraphs requested from the script generator
    #[serde(default = "default_paragraph_number")]
    pub paragraph_number: u32,
    /// Voice used for narration
    #[serde(default)]
    pub voice_name: String,
    /// Speech rate multiplier
    #[serde(default = "default_voice_rate")]
    pub voice_rate: f64,
    /// Output aspect ratio
    #[serde(default)]
    pub video_aspect: VideoAspect,
    /// Clip ordering
    #[serde(default)]
    pub video_concat_mode: ConcatMode,
    /// Maximum seconds taken from a single clip (also the minimum clip length)
    #[serde(default = "default_clip_duration")]
    pub video_clip_duration: u32,
    /// Number of final videos to produce
    #[serde(default = "default_video_count")]
    pub video_count: u32,
    /// Footage source
    #[serde(default)]
    pub video_source: VideoSource,
    /// Local materials (used when the source is local)
    #[serde(default)]
    pub video_materials: Vec<MaterialInfo>,
    /// Burn subtitles into the output
    #[serde(default = "default_true")]
    pub subtitle_enabled: bool,
    /// Splice an ad segment at the script's ad marker
    #[serde(default)]
    pub ad_enabled: bool,
    /// Narration for the ad segment
    #[serde(default)]
    pub ad_script: String,
    /// Footage for the ad segment
    #[serde(default)]
    pub ad_material: Option<MaterialInfo>,
    /// Thread hint for the compositor
    #[serde(default = "default_threads")]
    pub n_threads: u32,
    /// Render settings forwarded to the compositor
    #[serde(default)]
    pub render: RenderSettings,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            video_subject: String::new(),
            video_script: String::new(),
            video_terms: None,
            video_language: String::new(),
            paragraph_number: default_paragraph_number(),
            voice_name: String::new(),
            voice_rate: default_voice_rate(),
            video_aspect: VideoAspect::default(),
            video_concat_mode: ConcatMode::default(),
            video_clip_duration: default_clip_duration(),
            video_count: default_video_count(),
            video_source: VideoSource::default(),
            video_materials: vec![],
            subtitle_enabled: true,
            ad_enabled: false,
            ad_script: String::new(),
            ad_material: None,
            n_threads: default_threads(),
            render: RenderSettings::default(),
        }
    }
}

impl VideoParams {
    /// Parse parameters from JSON, rejecting malformed payloads
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidParams(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<()> {
        if self.video_count == 0 {
            return Err(Error::InvalidParams("video_count must be at least 1".into()));
        }
        if self.video_clip_duration == 0 {
            return Err(Error::InvalidParams(
                "video_clip_duration must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}

/// Audio and subtitle produced for one narration segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentAudio {
    /// Synthesized narration
    pub audio_file: PathBuf,
    /// Subtitle file (best effort)
    pub subtitle_path: Option<PathBuf>,
    /// Narration length in whole seconds
    pub duration: u64,
}

/// The three narration segments of an ad-mode run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdSegments {
    /// Narration before the ad
    pub pre: SegmentAudio,
    /// Ad narration
    pub ad: SegmentAudio,
    /// Narration after the ad
    pub post: SegmentAudio,
}

/// One production run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task id
    pub id: TaskId,
    /// Input configuration
    pub params: VideoParams,
    /// Lifecycle state
    pub state: TaskState,
    /// Progress percentage (0.0 to 100.0)
    pub progress: f64,
    /// Narration script, possibly containing the ad marker
    pub script: Option<String>,
    /// Footage search terms
    pub search_terms: Vec<String>,
    /// Narration length in whole seconds
    pub total_duration: Option<u64>,
    /// Ad mode: narration before the ad
    pub pre_ad_duration: Option<u64>,
    /// Ad mode: ad narration
    pub ad_duration: Option<u64>,
    /// Ad mode: narration after the ad
    pub post_ad_duration: Option<u64>,
    /// Narration audio (single-segment runs)
    pub audio_file: Option<PathBuf>,
    /// Subtitle file (single-segment runs)
    pub subtitle_path: Option<PathBuf>,
    /// Ad mode segment artifacts
    pub ad_segments: Option<AdSegments>,
    /// Local footage selected for composition
    pub material_urls: Vec<PathBuf>,
    /// Ad mode: resolved ad footage
    pub ad_material_info: Option<MaterialInfo>,
    /// Intermediate combined clips
    pub combined_videos: Vec<PathBuf>,
    /// Final videos
    pub videos: Vec<PathBuf>,
    /// Ad mode: rendered ad segment
    pub ad_video: Option<PathBuf>,
    /// Stage the run stopped after, when stopped early
    pub stopped_at: Option<Stage>,
    /// Failure description
    pub error: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// New pending task
    pub fn new(id: TaskId, params: VideoParams) -> Self {
        let now = Utc::now();
        Self {
            id,
            params,
            state: TaskState::Pending,
            progress: 0.0,
            script: None,
            search_terms: vec![],
            total_duration: None,
            pre_ad_duration: None,
            ad_duration: None,
            post_ad_duration: None,
            audio_file: None,
            subtitle_path: None,
            ad_segments: None,
            material_urls: vec![],
            ad_material_info: None,
            combined_videos: vec![],
            videos: vec![],
            ad_video: None,
            stopped_at: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge an update into the record, field by field
    ///
    /// Terminal tasks reject every update and progress never moves backwards.
    pub fn merge(&mut self, update: TaskUpdate) -> std::result::Result<(), StoreError> {
        if self.state.is_terminal() {
            return Err(StoreError::Terminal {
                id: self.id.clone(),
                state: self.state,
            });
        }
        if let Some(progress) = update.progress
            && progress < self.progress
        {
            return Err(StoreError::ProgressRegression {
                id: self.id.clone(),
                current: self.progress,
                requested: progress,
            });
        }

        let TaskUpdate {
            state,
            progress,
            script,
            search_terms,
            total_duration,
            pre_ad_duration,
            ad_duration,
            post_ad_duration,
            audio_file,
            subtitle_path,
            ad_segments,
            material_urls,
            ad_material_info,
            combined_videos,
            videos,
            ad_video,
            stopped_at,
            error,
        } = update;

        if let Some(v) = state {
            self.state = v;
        }
        if let Some(v) = progress {
            self.progress = v.clamp(0.0, 100.0);
        }
        if let Some(v) = script {
            self.script = Some(v);
        }
        if let Some(v) = search_terms {
            self.search_terms = v;
        }
        if let Some(v) = total_duration {
            self.total_duration = Some(v);
        }
        if let Some(v) = pre_ad_duration {
            self.pre_ad_duration = Some(v);
        }
        if let Some(v) = ad_duration {
            self.ad_duration = Some(v);
        }
        if let Some(v) = post_ad_duration {
            self.post_ad_duration = Some(v);
        }
        if let Some(v) = audio_file {
            self.audio_file = Some(v);
        }
        if let Some(v) = subtitle_path {
            self.subtitle_path = Some(v);
        }
        if let Some(v) = ad_segments {
            self.ad_segments = Some(v);
        }
        if let Some(v) = material_urls {
            self.material_urls = v;
        }
        if let Some(v) = ad_material_info {
            self.ad_material_info = Some(v);
        }
        if let Some(v) = combined_videos {
            self.combined_videos = v;
        }
        if let Some(v) = videos {
            self.videos = v;
        }
        if let Some(v) = ad_video {
            self.ad_video = Some(v);
        }
        if let Some(v) = stopped_at {
            self.stopped_at = Some(v);
        }
        if let Some(v) = error {
            self.error = Some(v);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether this run splices an ad segment
    pub fn ad_mode(&self) -> bool {
        self.ad_segments.is_some()
    }
}

/// Field-level delta applied to a [`Task`]; `None` leaves a field untouched
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TaskUpdate {
    pub state: Option<TaskState>,
    pub progress: Option<f64>,
    pub script: Option<String>,
    pub search_terms: Option<Vec<String>>,
    pub total_duration: Option<u64>,
    pub pre_ad_duration: Option<u64>,
    pub ad_duration: Option<u64>,
    pub post_ad_duration: Option<u64>,
    pub audio_file: Option<PathBuf>,
    pub subtitle_path: Option<PathBuf>,
    pub ad_segments: Option<AdSegments>,
    pub material_urls: Option<Vec<PathBuf>>,
    pub ad_material_info: Option<MaterialInfo>,
    pub combined_videos: Option<Vec<PathBuf>>,
    pub videos: Option<Vec<PathBuf>>,
    pub ad_video: Option<PathBuf>,
    pub stopped_at: Option<Stage>,
    pub error: Option<String>,
}

impl TaskUpdate {
    /// Progress-only update
    pub fn progress(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    /// Mark the task failed, freezing progress
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: Some(TaskState::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Set the progress on an existing delta
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Event emitted during a task run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Run started
    TaskStarted {
        /// Task id
        id: TaskId,
    },

    /// A stage began
    StageStarted {
        /// Task id
        id: TaskId,
        /// Stage
        stage: Stage,
    },

    /// Progress moved forward
    Progress {
        /// Task id
        id: TaskId,
        /// Progress percentage (0.0 to 100.0)
        percent: f64,
    },

    /// Run finished
    Complete {
        /// Task id
        id: TaskId,
        /// Set when the run stopped early
        #[serde(skip_serializing_if = "Option::is_none")]
        stopped_at: Option<Stage>,
    },

    /// Run failed
    Failed {
        /// Task id
        id: TaskId,
        /// Stage where failure occurred
        stage: Stage,
        /// Error message
        error: String,
    },
}

fn default_true() -> bool {
    true
}

fn default_paragraph_number() -> u32 {
    1
}

fn default_voice_rate() -> f64 {
    1.0
}

fn default_clip_duration() -> u32 {
    5
}

fn default_video_count() -> u32 {
    1
}

fn default_threads() -> u32 {
    2
}

fn default_font_name() -> String {
    "STHeitiMedium.ttc".into()
}

fn default_font_size() -> u32 {
    60
}

fn default_text_color() -> String {
    "#FFFFFF".into()
}

fn default_stroke_color() -> String {
    "#000000".into()
}

fn default_stroke_width() -> f64 {
    1.5
}

fn default_subtitle_position() -> String {
    "bottom".into()
}

fn default_bgm_volume() -> f64 {
    0.2
}

fn default_voice_volume() -> f64 {
    1.0
}
