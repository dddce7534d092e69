//! External collaborators the pipeline drives
//!
//! Script generation, speech synthesis, subtitle generation and video
//! compositing live outside this crate. The pipeline only sees the narrow
//! traits defined here; embedding applications supply the implementations.

mod traits;

pub use traits::{
    AdInsert, CombineRequest, Compositor, RenderRequest, ScriptGenerator, SpeechResult,
    SpeechSynthesizer, SpeechTiming, SubtitleGenerator, WordBoundary,
};

use std::sync::Arc;

/// The set of collaborators a [`Pipeline`](crate::Pipeline) runs against
#[derive(Clone)]
pub struct Collaborators {
    /// Script and term generation
    pub scripts: Arc<dyn ScriptGenerator>,
    /// Text-to-speech
    pub speech: Arc<dyn SpeechSynthesizer>,
    /// Subtitle generation
    pub subtitles: Arc<dyn SubtitleGenerator>,
    /// Video compositing
    pub compositor: Arc<dyn Compositor>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
