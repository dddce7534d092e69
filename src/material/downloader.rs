//! Fetching one material URL into the content-addressed cache

use super::pool::DownloadPool;
use crate::config::{Config, RetryConfig};
use crate::error::{DownloadError, Error, Result};
use crate::media::MediaProbe;
use crate::retry::download_with_retry;
use crate::utils::{file_size, material_file_name, remove_file_if_exists};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// An opened transfer: status, declared length and the body stream
pub struct SourceResponse {
    /// HTTP status code
    pub status: u16,
    /// Length declared by the server at connect time
    pub content_length: Option<u64>,
    /// Body chunks; a mid-stream failure is an `Interrupted` error
    pub body: BoxStream<'static, std::result::Result<Bytes, DownloadError>>,
}

/// Transport used by the downloader
#[async_trait]
pub trait MaterialSource: Send + Sync {
    /// Start a GET transfer of `url`
    async fn open(&self, url: &str) -> std::result::Result<SourceResponse, DownloadError>;
}

/// HTTP transport backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestSource {
    client: reqwest::Client,
}

impl ReqwestSource {
    /// Wrap an existing client
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client with the configured proxy and per-attempt timeout
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(crate::providers::http_client(
            &config.providers,
            config.material.download_timeout,
        )?))
    }
}

#[async_trait]
impl MaterialSource for ReqwestSource {
    async fn open(&self, url: &str) -> std::result::Result<SourceResponse, DownloadError> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| DownloadError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let source_url = url.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| body_error(&source_url, e)))
            .boxed();

        Ok(SourceResponse {
            status,
            content_length,
            body,
        })
    }
}

/// Timeouts are final; anything else that breaks the body mid-stream is retried
fn body_error(url: &str, e: reqwest::Error) -> DownloadError {
    if e.is_timeout() {
        DownloadError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else {
        DownloadError::Interrupted {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Downloads material URLs with caching, retries and integrity checks
///
/// A URL is stored as `vid-<md5 of url without query>.mp4` in the destination
/// directory. Data is written to a `.part` sibling and only renamed into place
/// after verification, so a cached file is always complete.
pub struct MaterialDownloader {
    source: Arc<dyn MaterialSource>,
    probe: Arc<dyn MediaProbe>,
    pool: DownloadPool,
    retry: RetryConfig,
}

impl MaterialDownloader {
    /// Create a downloader from its parts
    pub fn new(
        source: Arc<dyn MaterialSource>,
        probe: Arc<dyn MediaProbe>,
        pool: DownloadPool,
        retry: RetryConfig,
    ) -> Self {
        Self {
            source,
            probe,
            pool,
            retry,
        }
    }

    /// Downloader using HTTP and the configured retry policy
    pub fn from_config(
        config: &Config,
        probe: Arc<dyn MediaProbe>,
        pool: DownloadPool,
    ) -> Result<Self> {
        Ok(Self::new(
            Arc::new(ReqwestSource::from_config(config)?),
            probe,
            pool,
            config.material.retry.clone(),
        ))
    }

    /// Fetch `url` into `dir`, returning the local path
    ///
    /// A non-empty cached copy is returned without any network access.
    /// Cancelling `cancel` aborts a queued or running transfer and removes its
    /// partial output.
    pub async fn fetch(
        &self,
        url: &str,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<PathBuf, DownloadError> {
        let file_name = material_file_name(url);
        let path = dir.join(&file_name);

        if file_size(&path).await.unwrap_or(0) > 0 {
            tracing::info!(url, path = %path.display(), "material already cached");
            return Ok(path);
        }

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DownloadError::Transport {
                url: url.to_string(),
                reason: format!("cannot create {}: {}", dir.display(), e),
            })?;

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = self.pool.acquire() => permit,
        };
        let Some(permit) = permit else {
            return Err(DownloadError::Cancelled {
                url: url.to_string(),
            });
        };

        // Unique per attempt so concurrent fetches of one URL never share a file
        let part = dir.join(format!("{}.{}.part", file_name, uuid::Uuid::new_v4()));
        let part_ref: &Path = &part;
        let transferred = download_with_retry(&self.retry, move || {
            self.transfer(url, part_ref, cancel)
        })
        .await;
        drop(permit);

        let expected_len = match transferred {
            Ok(len) => len,
            Err(e) => {
                remove_file_if_exists(&part).await;
                return Err(match e {
                    DownloadError::Interrupted { .. } => DownloadError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: self.retry.max_attempts.max(1),
                    },
                    other => other,
                });
            }
        };

        if let Err(reason) = self.verify(&part, expected_len).await {
            remove_file_if_exists(&part).await;
            tracing::warn!(url, path = %path.display(), reason = %reason, "invalid video file");
            return Err(DownloadError::Integrity { path, reason });
        }

        tokio::fs::rename(&part, &path).await.map_err(|e| {
            DownloadError::Transport {
                url: url.to_string(),
                reason: format!("cannot move download into place: {}", e),
            }
        })?;

        tracing::info!(url, path = %path.display(), "material downloaded");
        Ok(path)
    }

    /// One attempt: stream the body into `part` from scratch
    async fn transfer(
        &self,
        url: &str,
        part: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<Option<u64>, DownloadError> {
        let cancelled = || DownloadError::Cancelled {
            url: url.to_string(),
        };
        let local_error = |e: std::io::Error| DownloadError::Transport {
            url: url.to_string(),
            reason: format!("cannot write {}: {}", part.display(), e),
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            response = self.source.open(url) => response?,
        };

        if response.status != 200 {
            tracing::error!(url, status = response.status, "failed to download material");
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        let mut file = tokio::fs::File::create(part).await.map_err(local_error)?;
        let mut body = response.body;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                chunk = body.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => file.write_all(&bytes).await.map_err(local_error)?,
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        file.flush().await.map_err(local_error)?;

        Ok(response.content_length)
    }

    /// Size must match the declared length and the file must decode cleanly
    async fn verify(&self, part: &Path, expected_len: Option<u64>) -> std::result::Result<(), String> {
        let size = file_size(part).await.unwrap_or(0);
        if let Some(expected) = expected_len
            && size != expected
        {
            return Err(format!("size {} does not match content length {}", size, expected));
        }

        match self.probe.validate(part).await {
            Ok(true) => Ok(()),
            Ok(false) => Err("media validation reported errors".into()),
            Err(Error::NotSupported(reason)) => {
                tracing::debug!(path = %part.display(), reason = %reason, "media validation skipped");
                Ok(())
            }
            Err(e) => Err(format!("media validation failed: {}", e)),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::NoOpMediaProbe;
    use crate::test_helpers::{FakeProbe, ScriptedSource, Transfer};
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const URL: &str = "https://cdn.example.com/clip.mp4?token=abc";

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    fn downloader(source: Arc<ScriptedSource>) -> MaterialDownloader {
        MaterialDownloader::new(
            source,
            Arc::new(FakeProbe::default()),
            DownloadPool::new(15),
            fast_retry(),
        )
    }

    fn no_leftovers(dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .map(|entries| entries.count() == 0)
            .unwrap_or(true)
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![Transfer::ok(b"6.0")]));
        let d = downloader(source.clone());
        let cancel = CancellationToken::new();

        let first = d.fetch(URL, temp.path(), &cancel).await.unwrap();
        let second = d
            .fetch("https://cdn.example.com/clip.mp4?token=other", temp.path(), &cancel)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1, "cache hit must not touch the network");
        assert_eq!(std::fs::read(&first).unwrap(), b"6.0");
        assert_eq!(first.file_name().unwrap(), material_file_name(URL).as_str());
    }

    #[tokio::test]
    async fn test_two_interruptions_then_success() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            Transfer::Interrupt,
            Transfer::Interrupt,
            Transfer::ok(b"6.0"),
        ]));
        let d = downloader(source.clone());

        let path = d
            .fetch(URL, temp.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(path.exists());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_three_interruptions_leave_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            Transfer::Interrupt,
            Transfer::Interrupt,
            Transfer::Interrupt,
            Transfer::ok(b"6.0"),
        ]));
        let d = downloader(source.clone());

        let err = d
            .fetch(URL, temp.path(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(source.calls(), 3, "never a fourth attempt");
        assert!(no_leftovers(temp.path()));
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            Transfer::Status(403),
            Transfer::ok(b"6.0"),
        ]));
        let d = downloader(source.clone());

        let err = d
            .fetch(URL, temp.path(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 403, .. }));
        assert_eq!(source.calls(), 1);
        assert!(no_leftovers(temp.path()));
    }

    #[tokio::test]
    async fn test_size_mismatch_removes_file() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![Transfer::Body {
            data: b"6.0".to_vec(),
            content_length: Some(1024),
        }]));
        let d = downloader(source);

        let err = d
            .fetch(URL, temp.path(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Integrity { .. }));
        assert!(no_leftovers(temp.path()));
    }

    #[tokio::test]
    async fn test_failed_media_validation_removes_file() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![Transfer::ok(b"corrupt")]));
        let d = downloader(source);

        let err = d
            .fetch(URL, temp.path(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Integrity { .. }));
        assert!(no_leftovers(temp.path()));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![Transfer::ok(b"6.0")]));
        let d = downloader(source.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = d.fetch(URL, temp.path(), &cancel).await.unwrap_err();
        assert!(matches!(err, DownloadError::Cancelled { .. }));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_http_download_with_content_length() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let d = MaterialDownloader::new(
            Arc::new(ReqwestSource::new(reqwest::Client::new())),
            Arc::new(NoOpMediaProbe),
            DownloadPool::new(2),
            fast_retry(),
        );
        let cancel = CancellationToken::new();

        let url = format!("{}/v/clip.mp4?sig=1", server.uri());
        let path = d.fetch(&url, temp.path(), &cancel).await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4096);

        // Cached: the mock's expect(1) fails the test on a second request
        d.fetch(&url, temp.path(), &cancel).await.unwrap();

        let missing = format!("{}/v/missing.mp4", server.uri());
        assert!(matches!(
            d.fetch(&missing, temp.path(), &cancel).await,
            Err(DownloadError::Status { status: 404, .. })
        ));
    }

    fn slow(data: &[u8]) -> Transfer {
        Transfer::Slow {
            data: data.to_vec(),
            delay: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_of_one_url_agree() {
        let temp = TempDir::new().unwrap();
        let body = vec![b'7'; 64 * 1024];
        let transfer = Transfer::Slow {
            data: body.clone(),
            delay: Duration::from_millis(100),
        };
        let source = Arc::new(ScriptedSource::routes(vec![(URL, transfer)]));
        let d = downloader(source.clone());
        let cancel = CancellationToken::new();

        let results =
            futures::future::join_all((0..4).map(|_| d.fetch(URL, temp.path(), &cancel))).await;

        let expected = temp.path().join(material_file_name(URL));
        for result in results {
            assert_eq!(result.unwrap(), expected);
        }
        assert_eq!(source.peak_in_flight(), 4, "all four transfers overlapped");
        assert_eq!(std::fs::read(&expected).unwrap(), body);

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![expected.file_name().unwrap().to_owned()]);
    }

    #[tokio::test]
    async fn test_transfers_in_flight_never_exceed_pool_limit() {
        let temp = TempDir::new().unwrap();
        let urls: Vec<String> = (0..6)
            .map(|i| format!("https://cdn.example.com/clip-{}.mp4", i))
            .collect();
        let source = Arc::new(ScriptedSource::routes(
            urls.iter().map(|u| (u.as_str(), slow(b"6.0"))).collect(),
        ));
        let pool = DownloadPool::new(2);
        let d = MaterialDownloader::new(
            source.clone(),
            Arc::new(FakeProbe::default()),
            pool.clone(),
            fast_retry(),
        );
        let cancel = CancellationToken::new();

        let results =
            futures::future::join_all(urls.iter().map(|u| d.fetch(u, temp.path(), &cancel)))
                .await;

        assert!(results.iter().all(std::result::Result::is_ok));
        assert_eq!(source.calls(), 6);
        assert_eq!(source.peak_in_flight(), 2);
        assert_eq!(pool.available(), 2, "every slot released");
    }
}
