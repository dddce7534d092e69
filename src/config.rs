//! Configuration types for autoreel

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Top-level configuration
///
/// Fields are organized into logical sub-configs:
/// - [`storage`](StorageConfig): task directories and the shared cache
/// - [`material`](MaterialConfig): download concurrency, retry, cache placement
/// - [`providers`](ProvidersConfig): stock-footage API keys and endpoints
/// - [`subtitle`](SubtitleConfig): subtitle provider selection
/// - [`tools`](ToolsConfig): external binary paths
/// - [`state`](StateConfig): task state store backend
/// - [`ad`](AdConfig): ad-insertion marker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Material acquisition settings
    #[serde(default)]
    pub material: MaterialConfig,

    /// Stock-footage providers
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Subtitle generation
    #[serde(default)]
    pub subtitle: SubtitleConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Task state store
    #[serde(default)]
    pub state: StateConfig,

    /// Ad insertion
    #[serde(default)]
    pub ad: AdConfig,
}

impl Config {
    /// Parse a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config {
            message: format!("invalid configuration: {}", e),
            key: None,
        })
    }

    /// Load a JSON configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_json_str(&content)
    }

    /// Working directory of a task
    pub fn task_dir(&self, task_id: &crate::types::TaskId) -> PathBuf {
        self.storage.storage_dir.join("tasks").join(task_id.as_str())
    }

    /// Shared material cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.storage.storage_dir.join("cache_videos")
    }
}

/// Storage layout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root storage directory (default: "./storage")
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
        }
    }
}

/// Material acquisition settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialConfig {
    /// Where downloads land: "" = shared cache, "task" = task directory,
    /// anything else = an existing directory (falls back to the shared cache)
    #[serde(default)]
    pub material_directory: String,

    /// Maximum simultaneous downloads across the process (default: 15)
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Total time allowed for a single download attempt (default: 300 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// Retry policy for interrupted transfers
    #[serde(default)]
    pub retry: RetryConfig,

    /// Cancel outstanding downloads once enough footage is collected (default: true)
    #[serde(default = "default_true")]
    pub eager_cancel: bool,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            material_directory: String::new(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            download_timeout: default_download_timeout(),
            retry: RetryConfig::default(),
            eager_cancel: true,
        }
    }
}

/// Retry configuration for interrupted transfers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 200 ms)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 200 ms)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0, fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// One API key or a list rotated round-robin
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiKeys {
    /// A single key, always used
    Single(String),
    /// Several keys, rotated per request
    Many(Vec<String>),
}

impl Default for ApiKeys {
    fn default() -> Self {
        ApiKeys::Many(vec![])
    }
}

impl ApiKeys {
    /// Non-blank keys in configuration order
    pub fn keys(&self) -> Vec<String> {
        let keys: Vec<&String> = match self {
            ApiKeys::Single(key) => vec![key],
            ApiKeys::Many(keys) => keys.iter().collect(),
        };
        keys.into_iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Stock-footage provider settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Pexels API key(s)
    #[serde(default)]
    pub pexels_api_keys: ApiKeys,

    /// Pixabay API key(s)
    #[serde(default)]
    pub pixabay_api_keys: ApiKeys,

    /// Pexels API root (default: "https://api.pexels.com")
    #[serde(default = "default_pexels_base_url")]
    pub pexels_base_url: String,

    /// Pixabay API root (default: "https://pixabay.com")
    #[serde(default = "default_pixabay_base_url")]
    pub pixabay_base_url: String,

    /// Results requested per Pexels search (default: 20)
    #[serde(default = "default_pexels_per_page")]
    pub pexels_per_page: u32,

    /// Results requested per Pixabay search (default: 50)
    #[serde(default = "default_pixabay_per_page")]
    pub pixabay_per_page: u32,

    /// HTTP(S) proxy for searches and downloads
    #[serde(default)]
    pub proxy: Option<String>,

    /// Search request timeout (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            pexels_api_keys: ApiKeys::default(),
            pixabay_api_keys: ApiKeys::default(),
            pexels_base_url: default_pexels_base_url(),
            pixabay_base_url: default_pixabay_base_url(),
            pexels_per_page: default_pexels_per_page(),
            pixabay_per_page: default_pixabay_per_page(),
            proxy: None,
            request_timeout: default_request_timeout(),
        }
    }
}

/// Subtitle provider
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleProvider {
    /// Build subtitles from synthesis timing, falling back to speech-to-text
    #[default]
    Edge,
    /// Speech-to-text followed by script correction
    Whisper,
}

/// Subtitle generation settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SubtitleConfig {
    /// Which subtitle provider to use
    #[serde(default)]
    pub provider: SubtitleProvider,
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to ffprobe executable (auto-detected if None)
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            search_path: true,
        }
    }
}

/// Task state store backend
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StateConfig {
    /// In-process map (default)
    #[default]
    Memory,
    /// SQLite file
    Sqlite {
        /// Database path
        path: PathBuf,
    },
}

/// Ad insertion settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdConfig {
    /// In-band token marking where the ad is spliced (default: "[AD]")
    #[serde(default = "default_ad_marker")]
    pub marker: String,
}

impl Default for AdConfig {
    fn default() -> Self {
        Self {
            marker: default_ad_marker(),
        }
    }
}

// Default value functions
fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage")
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_downloads() -> usize {
    15
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_max_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_pexels_base_url() -> String {
    "https://api.pexels.com".into()
}

fn default_pixabay_base_url() -> String {
    "https://pixabay.com".into()
}

fn default_pexels_per_page() -> u32 {
    20
}

fn default_pixabay_per_page() -> u32 {
    50
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_ad_marker() -> String {
    "[AD]".into()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper (retry delays are sub-second)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
