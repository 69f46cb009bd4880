use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info, info_span, warn};

use crate::collector::{CollectError, ResultCollector};
use crate::config::OdmConfig;
use crate::error::SubmitError;
use crate::nodeodm::{JobGateway, NodeOdmClient};
use crate::poller::{PollError, StatusPoller};
use crate::task::{
    Job, JobId, LifecycleRecord, LifecycleState, TaskOptions, TaskStatus, TransitionError,
};
use crate::upload::BatchUploader;

/// What the orchestrator needs besides a gateway.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Root holding one image directory per transaction.
    pub image_dir: PathBuf,
    pub batch_size: usize,
    pub poll_interval: Duration,
    /// Options used by [`Orchestrator::calculate_orthophoto`].
    pub task_options: TaskOptions,
}

impl From<&OdmConfig> for OrchestratorSettings {
    fn from(config: &OdmConfig) -> Self {
        Self {
            image_dir: config.image_dir.clone(),
            batch_size: config.batch_size,
            poll_interval: config.poll_interval(),
            task_options: config.task_options.clone(),
        }
    }
}

/// Failures of the detached phase. Logged, never returned to the submitter.
#[derive(Debug, Error)]
enum BackgroundError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("collecting results failed: {0}")]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Lifecycle(#[from] TransitionError),
}

/// The parts a detached task needs, shared with every task in flight.
struct Phases {
    gateway: Arc<dyn JobGateway>,
    uploader: BatchUploader,
    poller: StatusPoller,
    collector: ResultCollector,
}

/// Drives each submitted transaction through
/// create → upload → commit, then detaches poll → collect → remove.
pub struct Orchestrator {
    phases: Arc<Phases>,
    settings: OrchestratorSettings,
    tracker: TaskTracker,
    /// Parent of every lifecycle's token. Swapped for a fresh one on shutdown.
    cancel: Mutex<CancellationToken>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn JobGateway>, settings: OrchestratorSettings) -> Self {
        let phases = Phases {
            uploader: BatchUploader::new(Arc::clone(&gateway), settings.batch_size),
            poller: StatusPoller::new(Arc::clone(&gateway), settings.poll_interval),
            collector: ResultCollector::new(Arc::clone(&gateway)),
            gateway,
        };
        Self {
            phases: Arc::new(phases),
            settings,
            tracker: TaskTracker::new(),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Orchestrator talking to the NodeODM instance named in `config`.
    pub fn from_config(config: &OdmConfig) -> Self {
        let gateway: Arc<dyn JobGateway> = Arc::new(NodeOdmClient::from_config(config));
        Self::new(gateway, OrchestratorSettings::from(config))
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Submit the images of `transaction_id` with the configured task options.
    pub async fn calculate_orthophoto(&self, transaction_id: &str) -> Result<JobId, SubmitError> {
        self.calculate_orthophoto_with(transaction_id, &self.settings.task_options)
            .await
    }

    /// Create a task, upload every image and commit it, then return the task id.
    ///
    /// Polling, result collection and removal continue in a detached task
    /// whose outcome is only visible in the logs. A missing image directory
    /// is rejected before any network call.
    pub async fn calculate_orthophoto_with(
        &self,
        transaction_id: &str,
        options: &TaskOptions,
    ) -> Result<JobId, SubmitError> {
        let work_dir = self.transaction_dir(transaction_id)?;
        if !is_directory(&work_dir).await {
            warn!(transaction_id, dir = %work_dir.display(), "image directory does not exist");
            return Err(SubmitError::DirectoryNotFound(work_dir));
        }

        let gateway = &self.phases.gateway;
        let job_id = gateway
            .create_task(transaction_id, options)
            .await
            .map_err(|e| {
                error!(transaction_id, error = %e, "task creation failed");
                SubmitError::Create(e)
            })?;
        info!(job_id = %job_id, transaction_id, "task created");

        let mut job = Job::new(job_id.clone(), transaction_id, work_dir);
        job.advance(LifecycleState::Uploading)?;

        if let Err(source) = self.phases.uploader.upload(&job_id, &job.work_dir).await {
            error!(
                job_id = %job_id,
                batch = source.batch(),
                error = %source,
                "upload failed, task left uncommitted"
            );
            return Err(SubmitError::Upload { job_id, source });
        }

        // A failed commit leaves the task queued on the engine, so polling still decides.
        match gateway.commit_task(&job_id).await {
            Ok(()) => info!(job_id = %job_id, "task committed"),
            Err(e) => warn!(job_id = %job_id, error = %e, "commit failed, polling anyway"),
        }
        job.advance(LifecycleState::Committed)?;

        self.spawn_lifecycle(job);
        Ok(job_id)
    }

    /// Number of detached lifecycles still running.
    pub fn active_jobs(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every detached lifecycle has finished.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel every poll wait, then wait for the detached lifecycles to stop.
    ///
    /// Only lifecycles spawned before the call are cancelled; the orchestrator
    /// accepts new submissions afterwards.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.root_token(), CancellationToken::new());
        previous.cancel();
        self.drain().await;
    }

    fn root_token(&self) -> MutexGuard<'_, CancellationToken> {
        self.cancel.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn_lifecycle(&self, job: Job) {
        let phases = Arc::clone(&self.phases);
        let cancel = self.root_token().child_token();
        let span = info_span!("task", job_id = %job.id, transaction_id = %job.transaction_id);

        self.tracker.spawn(
            async move {
                let record = phases.finish(job, &cancel).await;
                match serde_json::to_string(&record) {
                    Ok(json) => info!(record = %json, "lifecycle finished at {}", record.final_state),
                    Err(_) => info!("lifecycle finished at {}", record.final_state),
                }
            }
            .instrument(span),
        );
    }

    fn transaction_dir(&self, transaction_id: &str) -> Result<PathBuf, SubmitError> {
        let mut components = Path::new(transaction_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.settings.image_dir.join(transaction_id)),
            _ => {
                warn!(transaction_id, "rejecting transaction id");
                Err(SubmitError::InvalidTransaction(transaction_id.to_string()))
            }
        }
    }
}

impl Phases {
    async fn finish(&self, mut job: Job, cancel: &CancellationToken) -> LifecycleRecord {
        if let Err(e) = self.drive(&mut job, cancel).await {
            match e {
                BackgroundError::Poll(PollError::Cancelled) => {
                    warn!(state = %job.state, "lifecycle cancelled")
                }
                other => error!(state = %job.state, error = %other, "lifecycle aborted"),
            }
        }
        LifecycleRecord::from_job(&job)
    }

    async fn drive(&self, job: &mut Job, cancel: &CancellationToken) -> Result<(), BackgroundError> {
        job.advance(LifecycleState::Polling)?;
        let job_id = job.id.clone();
        let mut rejected = None;
        let status = self
            .poller
            .await_terminal_observing(&job_id, cancel, |status| {
                if rejected.is_none()
                    && let Err(e) = job.observe(status)
                {
                    rejected = Some(e);
                }
            })
            .await?;
        if let Some(e) = rejected {
            return Err(e.into());
        }
        if let Some(next) = LifecycleState::from_terminal(status) {
            job.advance(next)?;
        }

        if status != TaskStatus::Completed {
            warn!(status = %status, "task ended without results");
            return Ok(());
        }

        self.collector.collect(&job.id, &job.work_dir).await?;

        match self.gateway.remove_task(&job.id).await {
            Ok(()) => info!("task removed from engine"),
            Err(e) => warn!(error = %e, "removing task from engine failed"),
        }
        job.advance(LifecycleState::Cleaned)?;
        Ok(())
    }
}

async fn is_directory(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
