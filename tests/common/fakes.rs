//! Collaborator and probe fakes implemented against the public traits

use async_trait::async_trait;
use autoreel::{
    CombineRequest, Compositor, Error, MediaProbe, ProbeCapabilities, RenderRequest, Result,
    ScriptGenerator, SpeechResult, SpeechSynthesizer, SpeechTiming, SubtitleGenerator,
    WordBoundary,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Probe reading a clip's duration from the file's text ("6" lasts 6 seconds)
pub struct TextProbe;

#[async_trait]
impl MediaProbe for TextProbe {
    async fn validate(&self, path: &Path) -> Result<bool> {
        Ok(tokio::fs::metadata(path).await?.len() > 0)
    }

    async fn duration(&self, path: &Path) -> Result<f64> {
        let content = tokio::fs::read_to_string(path).await?;
        content
            .trim()
            .parse()
            .map_err(|_| Error::ExternalTool(format!("unreadable clip {}", path.display())))
    }

    fn capabilities(&self) -> ProbeCapabilities {
        ProbeCapabilities {
            can_validate: true,
            can_measure: true,
        }
    }

    fn name(&self) -> &'static str {
        "text-probe"
    }
}

/// Script generator with canned output
pub struct CannedScripts {
    pub script: String,
    pub terms: Vec<String>,
}

#[async_trait]
impl ScriptGenerator for CannedScripts {
    async fn generate_script(&self, _subject: &str, _language: &str, _paragraphs: u32) -> Result<String> {
        Ok(self.script.clone())
    }

    async fn generate_terms(&self, _subject: &str, _script: &str, _amount: usize) -> Result<Vec<String>> {
        Ok(self.terms.clone())
    }
}

/// One word per second of speech
pub struct WordClock;

#[async_trait]
impl SpeechSynthesizer for WordClock {
    async fn synthesize(
        &self,
        text: &str,
        _voice_name: &str,
        _rate: f64,
        output: &Path,
    ) -> Result<Option<SpeechResult>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        tokio::fs::write(output, text).await?;
        let boundaries = text
            .split_whitespace()
            .enumerate()
            .map(|(i, word)| WordBoundary {
                text: word.to_string(),
                offset: Duration::from_secs(i as u64),
                duration: Duration::from_millis(800),
            })
            .collect();
        Ok(Some(SpeechResult {
            audio_file: output.to_path_buf(),
            timing: SpeechTiming { boundaries },
        }))
    }
}

/// Writes one cue per spoken word
pub struct CueWriter;

#[async_trait]
impl SubtitleGenerator for CueWriter {
    async fn from_timing(&self, _text: &str, timing: &SpeechTiming, output: &Path) -> Result<()> {
        let srt: String = timing
            .boundaries
            .iter()
            .enumerate()
            .map(|(i, b)| {
                format!(
                    "{}\n00:00:{:02},000 --> 00:00:{:02},800\n{}\n\n",
                    i + 1,
                    b.offset.as_secs(),
                    b.offset.as_secs(),
                    b.text
                )
            })
            .collect();
        tokio::fs::write(output, srt).await?;
        Ok(())
    }

    async fn transcribe(&self, _audio_file: &Path, _output: &Path) -> Result<()> {
        Err(Error::NotSupported("no speech-to-text in tests".into()))
    }

    async fn correct(&self, _subtitle_file: &Path, _script: &str) -> Result<()> {
        Ok(())
    }
}

/// Compositor recording every request and writing placeholder outputs
#[derive(Default)]
pub struct RecordingCompositor {
    pub combined: Mutex<Vec<CombineRequest>>,
    pub rendered: Mutex<Vec<RenderRequest>>,
}

#[async_trait]
impl Compositor for RecordingCompositor {
    async fn combine(&self, request: CombineRequest) -> Result<PathBuf> {
        tokio::fs::write(&request.output, b"combined").await?;
        let output = request.output.clone();
        self.combined.lock().unwrap().push(request);
        Ok(output)
    }

    async fn generate_video(&self, request: RenderRequest) -> Result<PathBuf> {
        tokio::fs::write(&request.output, b"final").await?;
        let output = request.output.clone();
        self.rendered.lock().unwrap().push(request);
        Ok(output)
    }
}
