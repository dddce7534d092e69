//! Pexels video search

use super::{KeyRotation, endpoint};
use crate::config::ProvidersConfig;
use crate::error::{Result, SearchError};
use crate::types::{MaterialInfo, MaterialProvider, VideoAspect};
use serde::Deserialize;

const PROVIDER: &str = "pexels";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    videos: Option<Vec<Video>>,
}

#[derive(Debug, Deserialize)]
struct Video {
    duration: f64,
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    width: Option<u32>,
    height: Option<u32>,
    link: String,
}

/// Pexels search adapter
///
/// Only encodings whose width and height match the target resolution exactly
/// are accepted.
#[derive(Debug)]
pub struct PexelsProvider {
    client: reqwest::Client,
    base_url: String,
    per_page: u32,
    keys: KeyRotation,
}

impl PexelsProvider {
    /// Create the adapter, failing if no API key is configured
    pub fn new(client: reqwest::Client, config: &ProvidersConfig) -> Result<Self> {
        Ok(Self {
            client,
            base_url: config.pexels_base_url.clone(),
            per_page: config.pexels_per_page,
            keys: KeyRotation::new("pexels_api_keys", &config.pexels_api_keys)?,
        })
    }

    pub(super) async fn try_search(
        &self,
        term: &str,
        min_duration: f64,
        aspect: VideoAspect,
    ) -> std::result::Result<Vec<MaterialInfo>, SearchError> {
        let url = endpoint(PROVIDER, &self.base_url, "videos/search")?;
        let per_page = self.per_page.to_string();

        tracing::info!(provider = PROVIDER, term, %url, "searching videos");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.keys.next_key())
            .query(&[
                ("query", term),
                ("per_page", per_page.as_str()),
                ("orientation", aspect.orientation()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Request {
                provider: PROVIDER,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        let body: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| SearchError::MalformedResponse {
                    provider: PROVIDER,
                    reason: e.to_string(),
                })?;

        let Some(videos) = body.videos else {
            tracing::error!(provider = PROVIDER, term, "response has no 'videos' key");
            return Ok(vec![]);
        };

        Ok(select(videos, term, min_duration, aspect))
    }
}

fn select(
    videos: Vec<Video>,
    term: &str,
    min_duration: f64,
    aspect: VideoAspect,
) -> Vec<MaterialInfo> {
    let (width, height) = aspect.to_resolution();
    videos
        .into_iter()
        .filter(|v| v.duration >= min_duration)
        .filter_map(|v| {
            v.video_files
                .into_iter()
                .find(|f| f.width == Some(width) && f.height == Some(height))
                .map(|f| MaterialInfo {
                    provider: MaterialProvider::Pexels,
                    url: f.link,
                    duration: v.duration,
                    search_term: Some(term.to_string()),
                })
        })
        .collect()
}
