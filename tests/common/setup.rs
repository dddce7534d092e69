//! Pipeline construction against wiremock endpoints

use super::fakes::{CannedScripts, CueWriter, RecordingCompositor, TextProbe, WordClock};
use autoreel::config::RetryConfig;
use autoreel::material::{DownloadPool, MaterialDownloader, ReqwestSource};
use autoreel::{ApiKeys, Collaborators, Config, MaterialInfo, MediaProbe, MemoryTaskStore, Pipeline};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A pipeline with its scratch directory and recording compositor
pub struct TestPipeline {
    pub temp: TempDir,
    pub pipeline: Pipeline,
    pub compositor: Arc<RecordingCompositor>,
}

/// Configuration pointing both providers at `server`
pub fn test_config(temp: &TempDir, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.storage.storage_dir = temp.path().join("storage");
    config.providers.pexels_api_keys = ApiKeys::Single("pexels-key".into());
    config.providers.pixabay_api_keys = ApiKeys::Single("pixabay-key".into());
    config.providers.pexels_base_url = server.uri();
    config.providers.pixabay_base_url = server.uri();
    config
}

/// Collaborators producing `script` and `terms`
pub fn collaborators(
    script: &str,
    terms: &[&str],
    compositor: Arc<RecordingCompositor>,
) -> Collaborators {
    Collaborators {
        scripts: Arc::new(CannedScripts {
            script: script.to_string(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }),
        speech: Arc::new(WordClock),
        subtitles: Arc::new(CueWriter),
        compositor,
    }
}

/// Pipeline downloading over real HTTP with a text probe and in-memory state
pub fn build_pipeline(server: &MockServer, script: &str, terms: &[&str]) -> TestPipeline {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp, server);
    let compositor = Arc::new(RecordingCompositor::default());

    let probe: Arc<dyn MediaProbe> = Arc::new(TextProbe);
    let downloader = Arc::new(MaterialDownloader::new(
        Arc::new(ReqwestSource::new(reqwest::Client::new())),
        probe.clone(),
        DownloadPool::new(4),
        RetryConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            ..Default::default()
        },
    ));
    let pipeline = Pipeline::with_components(
        config,
        Arc::new(MemoryTaskStore::new()),
        collaborators(script, terms, compositor.clone()),
        probe,
        downloader,
    );

    TestPipeline {
        temp,
        pipeline,
        compositor,
    }
}

/// Mount a Pexels search answering with `count` portrait clips served by
/// the same server, each `seconds` long; returns their URLs
pub async fn mount_pexels_clips(server: &MockServer, count: usize, seconds: u32) -> Vec<String> {
    let urls: Vec<String> = (0..count)
        .map(|i| format!("{}/files/clip-{}.mp4", server.uri(), i))
        .collect();
    let videos: Vec<_> = urls
        .iter()
        .map(|u| {
            json!({
                "duration": seconds,
                "video_files": [{"width": 1080, "height": 1920, "link": u}]
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/videos/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "videos": videos })))
        .mount(server)
        .await;
    urls
}

/// Write local clips whose content is their duration
pub fn write_local_clips(dir: &Path, durations: &[&str]) -> Vec<MaterialInfo> {
    std::fs::create_dir_all(dir).unwrap();
    durations
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let path = dir.join(format!("local-{}.mp4", i));
            std::fs::write(&path, d).unwrap();
            MaterialInfo::local(path.to_string_lossy())
        })
        .collect()
}
