//! Video generation pipeline split into focused submodules.
//!
//! The `Pipeline` struct and its stage methods are organized by domain:
//! - [`script`] - Script and search-term stages, `script.json`
//! - [`narration`] - Speech synthesis, ad-marker split and subtitles
//! - [`materials`] - Ad asset resolution and footage acquisition
//! - [`compose`] - Ad segment and final video composition
//!
//! A run walks the stages in order, committing each stage's output to the
//! task store before the next begins. Progress is fixed per stage (5, 10,
//! 20, 30, 40, 50) and the composition stage fills the rest. The first
//! failing stage marks the task failed and freezes its progress.

mod compose;
mod materials;
mod narration;
mod script;


use crate::config::Config;
use crate::error::{Error, Result, failing_stage};
use crate::material::{DownloadPool, MaterialAcquirer, MaterialDownloader};
use crate::media::{MediaProbe, probe_from_config};
use crate::providers::ProviderRegistry;
use crate::services::Collaborators;
use crate::state::{TaskStore, store_from_config};
use crate::types::{Event, Stage, Task, TaskId, TaskState, TaskUpdate, VideoParams, VideoSource};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Per-run bookkeeping
pub(crate) struct Run {
    pub(crate) id: TaskId,
    pub(crate) stop_at: Stage,
    pub(crate) dir: PathBuf,
    /// Stage currently executing, reported on failure
    pub(crate) stage: Stage,
}

/// Video generation pipeline (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Pipeline {
    /// Configuration shared with the acquirer
    pub(crate) config: Arc<Config>,
    /// Task progress records
    pub(crate) store: Arc<dyn TaskStore>,
    /// Script, speech, subtitle and compositing collaborators
    pub(crate) services: Collaborators,
    /// Media validation for local and ad materials
    pub(crate) probe: Arc<dyn MediaProbe>,
    /// Search adapters, built once and shared by every run
    pub(crate) providers: Arc<ProviderRegistry>,
    /// Footage search and download
    pub(crate) acquirer: Arc<MaterialAcquirer>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl Pipeline {
    /// Create a pipeline from configuration
    ///
    /// This initializes all core components:
    /// - Picks the media probe (ffmpeg on PATH or as configured)
    /// - Opens the configured task store, running migrations for SQLite
    /// - Sets up the shared download pool and HTTP downloader
    /// - Sets up the event broadcast channel
    pub async fn new(config: Config, services: Collaborators) -> Result<Self> {
        tokio::fs::create_dir_all(&config.storage.storage_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage directory '{}': {}",
                        config.storage.storage_dir.display(),
                        e
                    ),
                ))
            })?;

        let probe = probe_from_config(&config.tools);
        let store = store_from_config(&config.state).await?;
        let pool = DownloadPool::new(config.material.max_concurrent_downloads);
        let downloader = Arc::new(MaterialDownloader::from_config(&config, probe.clone(), pool)?);

        Ok(Self::with_components(config, store, services, probe, downloader))
    }

    /// Create a pipeline from explicit parts
    pub fn with_components(
        config: Config,
        store: Arc<dyn TaskStore>,
        services: Collaborators,
        probe: Arc<dyn MediaProbe>,
        downloader: Arc<MaterialDownloader>,
    ) -> Self {
        let config = Arc::new(config);
        let acquirer = Arc::new(MaterialAcquirer::new(
            config.clone(),
            downloader,
            probe.clone(),
        ));
        let providers = Arc::new(ProviderRegistry::new(config.clone()));
        let (event_tx, _rx) = broadcast::channel(1000);

        Self {
            config,
            store,
            services,
            probe,
            providers,
            acquirer,
            event_tx,
        }
    }

    /// Subscribe to run events
    ///
    /// Each receiver gets every event emitted after it subscribed. A slow
    /// receiver that falls more than 1000 events behind sees a `Lagged` error.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Task store used by this pipeline
    pub fn store(&self) -> Arc<dyn TaskStore> {
        Arc::clone(&self.store)
    }

    /// Fetch a task's record
    pub async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        self.store.get(id).await
    }

    /// Run the pipeline for a task, stopping after `stop_at`
    ///
    /// Returns the final record. A stage failure (empty script, no materials,
    /// compositor error, ...) is recorded on the task, which is returned with
    /// state `Failed`. Configuration, store and I/O errors also mark the task
    /// failed but are returned as `Err`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidParams` before any task is created when `params` fail
    /// validation; `StoreError::AlreadyExists` when a task with this id is
    /// still running.
    pub async fn run(&self, id: TaskId, params: VideoParams, stop_at: Stage) -> Result<Task> {
        params.validate()?;
        self.store.create(Task::new(id.clone(), params)).await?;
        tracing::info!(task_id = %id, stop_at = %stop_at, "start task");

        let mut run = Run {
            dir: self.config.task_dir(&id),
            id,
            stop_at,
            stage: Stage::Script,
        };
        self.emit_event(Event::TaskStarted { id: run.id.clone() });

        match self.execute(&mut run).await {
            Ok(task) => Ok(task),
            Err(e) => self.fail(&run, e).await,
        }
    }

    async fn execute(&self, run: &mut Run) -> Result<Task> {
        tokio::fs::create_dir_all(&run.dir).await?;
        let mut task = self
            .commit(
                &run.id,
                TaskUpdate {
                    state: Some(TaskState::Processing),
                    ..Default::default()
                }
                .with_progress(5.0),
            )
            .await?;

        self.enter(run, Stage::Script);
        let update = self.script_stage(&task).await?;
        task = self.commit(&run.id, update.with_progress(10.0)).await?;
        if run.stop_at == Stage::Script {
            return self.finish(run).await;
        }

        if task.params.video_source != VideoSource::Local {
            self.enter(run, Stage::Terms);
            let update = self.terms_stage(&task).await?;
            task = self.commit(&run.id, update).await?;
        }
        self.save_script_data(&run.dir, &task).await?;
        if run.stop_at == Stage::Terms {
            return self.finish(run).await;
        }
        task = self.commit(&run.id, TaskUpdate::progress(20.0)).await?;

        self.enter(run, Stage::Audio);
        let (narration, update) = self.audio_stage(&run.dir, &task).await?;
        task = self.commit(&run.id, update.with_progress(30.0)).await?;
        if run.stop_at == Stage::Audio {
            return self.finish(run).await;
        }

        self.enter(run, Stage::Subtitle);
        let update = self.subtitle_stage(&run.dir, &task, &narration).await;
        task = self.commit(&run.id, update.with_progress(40.0)).await?;
        if run.stop_at == Stage::Subtitle {
            return self.finish(run).await;
        }

        self.enter(run, Stage::Materials);
        let update = self.materials_stage(&task).await?;
        task = self.commit(&run.id, update.with_progress(50.0)).await?;
        if run.stop_at == Stage::Materials {
            return self.finish(run).await;
        }

        self.enter(run, Stage::Video);
        let update = self.video_stage(run, &task).await?;
        self.commit(&run.id, update).await?;
        self.finish(run).await
    }

    fn enter(&self, run: &mut Run, stage: Stage) {
        run.stage = stage;
        tracing::info!(task_id = %run.id, stage = %stage, "stage started");
        self.emit_event(Event::StageStarted {
            id: run.id.clone(),
            stage,
        });
    }

    /// Merge an update into the stored task, announcing any progress change
    pub(crate) async fn commit(&self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
        let progress = update.progress;
        let task = self.store.update(id, update).await?;
        if let Some(percent) = progress {
            self.emit_event(Event::Progress {
                id: id.clone(),
                percent,
            });
        }
        Ok(task)
    }

    async fn finish(&self, run: &Run) -> Result<Task> {
        let stopped_at = (run.stop_at != Stage::Video).then_some(run.stop_at);
        let task = self
            .commit(
                &run.id,
                TaskUpdate {
                    state: Some(TaskState::Complete),
                    stopped_at,
                    ..Default::default()
                }
                .with_progress(100.0),
            )
            .await?;

        tracing::info!(
            task_id = %run.id,
            videos = task.videos.len(),
            stopped_at = ?stopped_at,
            "task completed"
        );
        self.emit_event(Event::Complete {
            id: run.id.clone(),
            stopped_at,
        });
        Ok(task)
    }

    async fn fail(&self, run: &Run, e: Error) -> Result<Task> {
        let stage = match &e {
            Error::Stage(stage_error) => failing_stage(stage_error),
            _ => run.stage,
        };
        tracing::error!(
            task_id = %run.id,
            stage = %stage,
            code = e.code(),
            error = %e,
            "task failed"
        );

        let recorded = self
            .store
            .update(&run.id, TaskUpdate::failed(e.to_string()))
            .await;
        self.emit_event(Event::Failed {
            id: run.id.clone(),
            stage,
            error: e.to_string(),
        });

        if e.is_stage_failure() {
            return recorded;
        }
        if let Err(store_error) = recorded {
            tracing::warn!(task_id = %run.id, error = %store_error, "failed to record task failure");
        }
        Err(e)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
