//! Fixed-interval status polling until a task reaches a terminal status.
//!
//! A failed status query ends polling at once: an unreachable engine is an
//! infrastructure fault, not a "still running" answer. A code outside the
//! documented set is logged and polled again. The wait between polls is the
//! only point where cancellation is observed.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::nodeodm::{JobGateway, NodeOdmError};
use crate::task::{JobId, TaskStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum PollError {
    #[error("status query failed: {0}")]
    Gateway(#[from] NodeOdmError),

    #[error("polling cancelled")]
    Cancelled,
}

pub struct StatusPoller {
    gateway: Arc<dyn JobGateway>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(gateway: Arc<dyn JobGateway>, interval: Duration) -> Self {
        Self { gateway, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `job_id` until the engine reports a terminal status and return it.
    ///
    /// No status query is issued after the terminal one. There is no upper
    /// bound on how long this runs; cancel `cancel` to stop at the next wait.
    pub async fn await_terminal(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> Result<TaskStatus, PollError> {
        self.await_terminal_observing(job_id, cancel, |_| {}).await
    }

    /// Like [`await_terminal`](Self::await_terminal), handing every reported
    /// status to `on_status` in order, the terminal one included.
    pub async fn await_terminal_observing(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
        mut on_status: impl FnMut(TaskStatus) + Send,
    ) -> Result<TaskStatus, PollError> {
        let mut polls = 0u32;
        loop {
            let info = self.gateway.task_info(job_id).await?;
            polls += 1;
            let status = info.status();
            on_status(status);
            info!(
                job_id = %job_id,
                status = %status,
                progress = info.progress.unwrap_or_default(),
                images = info.images_count.unwrap_or_default(),
                polls,
                "task status"
            );

            if let TaskStatus::Unknown(code) = status {
                warn!(job_id = %job_id, code, "invalid status code, polling again");
            }
            if status.is_terminal() {
                if let Some(message) = &info.status.error_message {
                    warn!(job_id = %job_id, status = %status, "engine reported: {message}");
                }
                return Ok(status);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(job_id = %job_id, polls, "polling cancelled");
                    return Err(PollError::Cancelled);
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
