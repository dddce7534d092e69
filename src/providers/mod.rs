//! Stock-footage search
//!
//! Each supported provider has its own adapter; [`FootageProvider`] is the
//! closed set of them, chosen per acquisition from the task's
//! [`VideoSource`]. [`ProviderRegistry`] builds each adapter on first use and
//! hands the same instance to every later acquisition, so key rotation
//! carries over from one task to the next. Search failures never abort an
//! acquisition: they are logged and turn into an empty result for that term.

mod keys;
mod pexels;
mod pixabay;

pub use keys::KeyRotation;
pub use pexels::PexelsProvider;
pub use pixabay::PixabayProvider;

use crate::config::{Config, ProvidersConfig};
use crate::error::{Error, Result, SearchError};
use crate::types::{MaterialInfo, VideoAspect, VideoSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// Browser-like user agent; some CDNs reject unknown clients
pub(crate) const USER_AGENT: &str = "Mozilla/5.0";

/// A stock-footage provider selected for one acquisition
#[derive(Debug)]
pub enum FootageProvider {
    /// Pexels
    Pexels(PexelsProvider),
    /// Pixabay
    Pixabay(PixabayProvider),
}

impl FootageProvider {
    /// Select the provider for a footage source
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the provider has no API key or the proxy is invalid
    /// - `Error::InvalidParams` for the local source, which has no search
    pub fn from_source(config: &Config, source: VideoSource) -> Result<Self> {
        let providers = &config.providers;
        match source {
            VideoSource::Pexels => Ok(FootageProvider::Pexels(PexelsProvider::new(
                http_client(providers, providers.request_timeout)?,
                providers,
            )?)),
            VideoSource::Pixabay => Ok(FootageProvider::Pixabay(PixabayProvider::new(
                http_client(providers, providers.request_timeout)?,
                providers,
            )?)),
            VideoSource::Local => Err(Error::InvalidParams(
                "local footage has no search provider".into(),
            )),
        }
    }

    /// Provider tag for logging
    pub fn name(&self) -> &'static str {
        match self {
            FootageProvider::Pexels(_) => "pexels",
            FootageProvider::Pixabay(_) => "pixabay",
        }
    }

    /// Candidates for `term` lasting at least `min_duration` seconds
    ///
    /// Request and response failures are logged and yield an empty list.
    pub async fn search(
        &self,
        term: &str,
        min_duration: f64,
        aspect: VideoAspect,
    ) -> Vec<MaterialInfo> {
        let result = match self {
            FootageProvider::Pexels(p) => p.try_search(term, min_duration, aspect).await,
            FootageProvider::Pixabay(p) => p.try_search(term, min_duration, aspect).await,
        };
        match result {
            Ok(items) => {
                tracing::info!(provider = self.name(), term, found = items.len(), "search finished");
                items
            }
            Err(e) => {
                tracing::error!(provider = self.name(), term, error = %e, "search videos failed");
                vec![]
            }
        }
    }
}

/// Provider adapters shared by every acquisition of a pipeline
///
/// An adapter is built the first time its source is requested. A failed
/// build (missing key, bad proxy) is not cached and is reported again on the
/// next request.
#[derive(Debug)]
pub struct ProviderRegistry {
    config: Arc<Config>,
    pexels: OnceCell<FootageProvider>,
    pixabay: OnceCell<FootageProvider>,
}

impl ProviderRegistry {
    /// Create an empty registry; adapters are built lazily from `config`
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            pexels: OnceCell::new(),
            pixabay: OnceCell::new(),
        }
    }

    /// Adapter for `source`, building it on first use
    ///
    /// # Errors
    ///
    /// Same as [`FootageProvider::from_source`].
    pub async fn get(&self, source: VideoSource) -> Result<&FootageProvider> {
        let cell = match source {
            VideoSource::Pexels => &self.pexels,
            VideoSource::Pixabay => &self.pixabay,
            VideoSource::Local => {
                return Err(Error::InvalidParams(
                    "local footage has no search provider".into(),
                ));
            }
        };
        cell.get_or_try_init(|| async {
            let provider = FootageProvider::from_source(&self.config, source)?;
            tracing::debug!(provider = provider.name(), "search provider ready");
            Ok(provider)
        })
        .await
    }
}

/// HTTP client honoring the configured proxy
pub(crate) fn http_client(config: &ProvidersConfig, timeout: Duration) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT);

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| Error::config("proxy", format!("invalid proxy '{}': {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| Error::Other(format!("failed to build HTTP client: {}", e)))
}

/// Join an API path onto a configured base URL
fn endpoint(
    provider: &'static str,
    base: &str,
    path: &str,
) -> std::result::Result<Url, SearchError> {
    let base = format!("{}/", base.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|b| b.join(path))
        .map_err(|e| SearchError::Request {
            provider,
            reason: format!("invalid base url '{}': {}", base, e),
        })
}
