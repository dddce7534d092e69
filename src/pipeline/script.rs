//! Script and search-term stages

use super::Pipeline;
use crate::error::{Result, StageError};
use crate::types::{Task, TaskUpdate, VideoParams};
use serde::Serialize;
use std::path::Path;

/// Terms requested from the generator
const TERM_AMOUNT: usize = 5;

/// Record of a run's inputs, written next to its artifacts
#[derive(Serialize)]
struct ScriptData<'a> {
    script: &'a str,
    search_terms: &'a [String],
    params: &'a VideoParams,
}

impl Pipeline {
    /// Use the caller's script or generate one
    pub(super) async fn script_stage(&self, task: &Task) -> Result<TaskUpdate> {
        let params = &task.params;
        let supplied = params.video_script.trim();

        let script = if supplied.is_empty() {
            self.services
                .scripts
                .generate_script(
                    &params.video_subject,
                    &params.video_language,
                    params.paragraph_number,
                )
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(task_id = %task.id, error = %e, "script generator failed");
                    String::new()
                })
        } else {
            tracing::debug!(task_id = %task.id, "using supplied video script");
            supplied.to_string()
        };

        let script = script.trim();
        if script.is_empty() {
            return Err(StageError::EmptyScript.into());
        }

        Ok(TaskUpdate {
            script: Some(script.to_string()),
            ..Default::default()
        })
    }

    /// Use the caller's terms or extract them from the script
    pub(super) async fn terms_stage(&self, task: &Task) -> Result<TaskUpdate> {
        let params = &task.params;
        let supplied = params
            .video_terms
            .as_ref()
            .map(|t| t.to_terms())
            .unwrap_or_default();

        let terms = if supplied.is_empty() {
            let script = strip_marker(task.script.as_deref().unwrap_or_default(), &self.config.ad.marker);
            self.services
                .scripts
                .generate_terms(&params.video_subject, &script, TERM_AMOUNT)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(task_id = %task.id, error = %e, "term generator failed");
                    vec![]
                })
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        } else {
            supplied
        };

        if terms.is_empty() {
            return Err(StageError::EmptyTerms.into());
        }
        tracing::debug!(task_id = %task.id, terms = ?terms, "video terms");

        Ok(TaskUpdate {
            search_terms: Some(terms),
            ..Default::default()
        })
    }

    /// Write `script.json` (script, terms and parameters) into the task directory
    pub(super) async fn save_script_data(&self, dir: &Path, task: &Task) -> Result<()> {
        let data = ScriptData {
            script: task.script.as_deref().unwrap_or_default(),
            search_terms: &task.search_terms,
            params: &task.params,
        };
        let json = serde_json::to_string_pretty(&data)?;
        tokio::fs::write(dir.join("script.json"), json).await?;
        Ok(())
    }
}

/// Script with every ad marker removed
pub(crate) fn strip_marker(script: &str, marker: &str) -> String {
    if marker.is_empty() {
        return script.trim().to_string();
    }
    script.replace(marker, " ").trim().to_string()
}
