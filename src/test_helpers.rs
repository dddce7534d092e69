//! Shared fakes for unit tests: transport, media probe and collaborators.

use crate::error::{DownloadError, Error, Result};
use crate::material::{MaterialSource, SourceResponse};
use crate::media::{MediaProbe, ProbeCapabilities};
use crate::services::{
    CombineRequest, Compositor, RenderRequest, ScriptGenerator, SpeechResult, SpeechSynthesizer,
    SpeechTiming, SubtitleGenerator, WordBoundary,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Probe that reads a file's duration from its text content.
///
/// A file containing "6.5" lasts 6.5 seconds; a file starting with "corrupt"
/// fails validation.
#[derive(Default)]
pub(crate) struct FakeProbe {
    pub(crate) validations: AtomicUsize,
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn validate(&self, path: &Path) -> Result<bool> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        let content = tokio::fs::read(path).await?;
        Ok(!content.starts_with(b"corrupt"))
    }

    async fn duration(&self, path: &Path) -> Result<f64> {
        let content = tokio::fs::read_to_string(path).await?;
        content
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::ExternalTool(format!("not a duration: {}", path.display())))
    }

    fn capabilities(&self) -> ProbeCapabilities {
        ProbeCapabilities {
            can_validate: true,
            can_measure: true,
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Outcome of one simulated transfer
#[derive(Clone, Debug)]
pub(crate) enum Transfer {
    /// 200 with a body and declared length
    Body {
        data: Vec<u8>,
        content_length: Option<u64>,
    },
    /// 200, one chunk, then a mid-stream failure
    Interrupt,
    /// 200, one chunk, then nothing ever again
    Stall,
    /// 200 with the whole body delivered after `delay`
    Slow { data: Vec<u8>, delay: Duration },
    /// Non-200 status
    Status(u16),
}

impl Transfer {
    pub(crate) fn ok(data: &[u8]) -> Self {
        Transfer::Body {
            data: data.to_vec(),
            content_length: Some(data.len() as u64),
        }
    }
}

/// Held by a body stream; releases its in-flight slot when the stream drops
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Transport replaying scripted outcomes, either in call order or per URL
///
/// A transfer counts as in flight from `open` until its body is dropped.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    queue: Mutex<VecDeque<Transfer>>,
    routes: HashMap<String, Transfer>,
    calls: AtomicUsize,
    opened: Mutex<Vec<String>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Transfer>) -> Self {
        Self {
            queue: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub(crate) fn routes(routes: Vec<(&str, Transfer)>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|(url, t)| (url.to_string(), t))
                .collect(),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// Most transfers ever open at the same time
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MaterialSource for ScriptedSource {
    async fn open(&self, url: &str) -> std::result::Result<SourceResponse, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.opened.lock().unwrap().push(url.to_string());

        let next = match self.routes.get(url) {
            Some(t) => Some(t.clone()),
            None => self.queue.lock().unwrap().pop_front(),
        };
        let Some(transfer) = next else {
            return Err(DownloadError::Transport {
                url: url.to_string(),
                reason: "no scripted response".into(),
            });
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(self.in_flight.clone());

        let owned_url = url.to_string();
        let response = match transfer {
            Transfer::Body {
                data,
                content_length,
            } => SourceResponse {
                status: 200,
                content_length,
                body: futures::stream::iter(vec![Ok(Bytes::from(data))]).boxed(),
            },
            Transfer::Interrupt => SourceResponse {
                status: 200,
                content_length: Some(1024),
                body: futures::stream::iter(vec![
                    Ok(Bytes::from_static(b"partial")),
                    Err(DownloadError::Interrupted {
                        url: owned_url,
                        reason: "connection reset".into(),
                    }),
                ])
                .boxed(),
            },
            Transfer::Stall => SourceResponse {
                status: 200,
                content_length: Some(1024),
                body: futures::stream::iter(vec![Ok(Bytes::from_static(b"partial"))])
                    .chain(futures::stream::pending())
                    .boxed(),
            },
            Transfer::Slow { data, delay } => SourceResponse {
                status: 200,
                content_length: Some(data.len() as u64),
                body: futures::stream::once(async move {
                    tokio::time::sleep(delay).await;
                    Ok(Bytes::from(data))
                })
                .boxed(),
            },
            Transfer::Status(status) => SourceResponse {
                status,
                content_length: None,
                body: futures::stream::empty().boxed(),
            },
        };
        let body = response
            .body
            .map(move |chunk| {
                let _held = &guard;
                chunk
            })
            .boxed();
        Ok(SourceResponse { body, ..response })
    }
}

/// Script generator returning fixed text
#[derive(Default)]
pub(crate) struct FakeScripts {
    pub(crate) script: String,
    pub(crate) terms: Vec<String>,
    pub(crate) script_calls: AtomicUsize,
    pub(crate) term_calls: AtomicUsize,
}

#[async_trait]
impl ScriptGenerator for FakeScripts {
    async fn generate_script(&self, _subject: &str, _language: &str, _paragraphs: u32) -> Result<String> {
        self.script_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.script.clone())
    }

    async fn generate_terms(&self, _subject: &str, _script: &str, _amount: usize) -> Result<Vec<String>> {
        self.term_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.terms.clone())
    }
}

/// Synthesizer that speaks one word per second and writes the text as audio
#[derive(Default)]
pub(crate) struct FakeSpeech {
    /// Texts containing this fragment produce no result
    pub(crate) fail_on: Option<String>,
    pub(crate) spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(
        &self,
        text: &str,
        _voice_name: &str,
        _rate: f64,
        output: &Path,
    ) -> Result<Option<SpeechResult>> {
        self.spoken.lock().unwrap().push(text.to_string());
        if text.trim().is_empty()
            || self
                .fail_on
                .as_deref()
                .is_some_and(|fragment| text.contains(fragment))
        {
            return Ok(None);
        }
        tokio::fs::write(output, text).await?;
        let boundaries = text
            .split_whitespace()
            .enumerate()
            .map(|(i, word)| WordBoundary {
                text: word.to_string(),
                offset: Duration::from_secs(i as u64),
                duration: Duration::from_millis(900),
            })
            .collect();
        Ok(Some(SpeechResult {
            audio_file: output.to_path_buf(),
            timing: SpeechTiming { boundaries },
        }))
    }
}

pub(crate) const SRT: &str = "1\n00:00:00,000 --> 00:00:01,000\nhello\n";

/// Subtitle generator writing a one-cue SRT file
#[derive(Default)]
pub(crate) struct FakeSubtitles {
    /// Timing-based generation writes nothing (forces the fallback)
    pub(crate) timing_broken: bool,
    pub(crate) timing_calls: AtomicUsize,
    pub(crate) transcribe_calls: AtomicUsize,
    pub(crate) correct_calls: AtomicUsize,
}

#[async_trait]
impl SubtitleGenerator for FakeSubtitles {
    async fn from_timing(&self, _text: &str, _timing: &SpeechTiming, output: &Path) -> Result<()> {
        self.timing_calls.fetch_add(1, Ordering::SeqCst);
        if self.timing_broken {
            return Err(Error::ExternalTool("no word boundaries".into()));
        }
        tokio::fs::write(output, SRT).await?;
        Ok(())
    }

    async fn transcribe(&self, _audio_file: &Path, output: &Path) -> Result<()> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(output, SRT).await?;
        Ok(())
    }

    async fn correct(&self, _subtitle_file: &Path, _script: &str) -> Result<()> {
        self.correct_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Compositor that writes placeholder files and records requests
#[derive(Default)]
pub(crate) struct FakeCompositor {
    pub(crate) fail_render: bool,
    pub(crate) combined: Mutex<Vec<CombineRequest>>,
    pub(crate) rendered: Mutex<Vec<RenderRequest>>,
}

#[async_trait]
impl Compositor for FakeCompositor {
    async fn combine(&self, request: CombineRequest) -> Result<PathBuf> {
        tokio::fs::write(&request.output, b"combined").await?;
        let output = request.output.clone();
        self.combined.lock().unwrap().push(request);
        Ok(output)
    }

    async fn generate_video(&self, request: RenderRequest) -> Result<PathBuf> {
        if self.fail_render {
            return Err(Error::ExternalTool("encoder crashed".into()));
        }
        tokio::fs::write(&request.output, b"final").await?;
        let output = request.output.clone();
        self.rendered.lock().unwrap().push(request);
        Ok(output)
    }
}
