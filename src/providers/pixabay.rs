//! Pixabay video search

use super::{KeyRotation, endpoint};
use crate::config::ProvidersConfig;
use crate::error::{Result, SearchError};
use crate::types::{MaterialInfo, MaterialProvider, VideoAspect};
use serde::Deserialize;

const PROVIDER: &str = "pixabay";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Option<Vec<Hit>>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    duration: f64,
    #[serde(default)]
    videos: Encodings,
}

#[derive(Debug, Default, Deserialize)]
struct Encodings {
    large: Option<Encoding>,
    medium: Option<Encoding>,
    small: Option<Encoding>,
    tiny: Option<Encoding>,
}

impl Encodings {
    /// Highest quality first
    fn by_quality(self) -> impl Iterator<Item = Encoding> {
        [self.large, self.medium, self.small, self.tiny]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Deserialize)]
struct Encoding {
    #[serde(default)]
    url: String,
    #[serde(default)]
    width: u32,
}

/// Pixabay search adapter
///
/// Accepts the best encoding whose width is at least the target width.
#[derive(Debug)]
pub struct PixabayProvider {
    client: reqwest::Client,
    base_url: String,
    per_page: u32,
    keys: KeyRotation,
}

impl PixabayProvider {
    /// Create the adapter, failing if no API key is configured
    pub fn new(client: reqwest::Client, config: &ProvidersConfig) -> Result<Self> {
        Ok(Self {
            client,
            base_url: config.pixabay_base_url.clone(),
            per_page: config.pixabay_per_page,
            keys: KeyRotation::new("pixabay_api_keys", &config.pixabay_api_keys)?,
        })
    }

    pub(super) async fn try_search(
        &self,
        term: &str,
        min_duration: f64,
        aspect: VideoAspect,
    ) -> std::result::Result<Vec<MaterialInfo>, SearchError> {
        let url = endpoint(PROVIDER, &self.base_url, "api/videos/")?;
        let per_page = self.per_page.to_string();

        tracing::info!(provider = PROVIDER, term, %url, "searching videos");

        let response = self
            .client
            .get(url)
            .query(&[
                ("q", term),
                ("video_type", "all"),
                ("per_page", per_page.as_str()),
                ("key", self.keys.next_key()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Request {
                provider: PROVIDER,
                reason: e.without_url().to_string(),
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
                    reason: e.without_url().to_string(),
                })?;

        let Some(hits) = body.hits else {
            tracing::error!(provider = PROVIDER, term, "response has no 'hits' key");
            return Ok(vec![]);
        };

        Ok(select(hits, term, min_duration, aspect))
    }
}

fn select(hits: Vec<Hit>, term: &str, min_duration: f64, aspect: VideoAspect) -> Vec<MaterialInfo> {
    let (width, _) = aspect.to_resolution();
    hits.into_iter()
        .filter(|h| h.duration >= min_duration)
        .filter_map(|h| {
            let duration = h.duration;
            h.videos
                .by_quality()
                .find(|e| e.width >= width && !e.url.is_empty())
                .map(|e| MaterialInfo {
                    provider: MaterialProvider::Pixabay,
                    url: e.url,
                    duration,
                    search_term: Some(term.to_string()),
                })
        })
        .collect()
}
