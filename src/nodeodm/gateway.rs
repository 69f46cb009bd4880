use std::path::Path;

use async_trait::async_trait;

use super::error::NodeOdmError;
use super::types::{BatchFile, TaskInfo};
use crate::task::{JobId, TaskOptions};

/// One method per remote task operation.
///
/// Implementations hold no per-task state, so a single instance is shared
/// by every in-flight task.
#[async_trait]
pub trait JobGateway: Send + Sync {
    /// Register a new task named `name`. The engine assigns the id.
    async fn create_task(&self, name: &str, options: &TaskOptions) -> Result<JobId, NodeOdmError>;

    /// Send one batch of images. The files are consumed and closed when the call returns.
    async fn upload_batch(&self, job_id: &JobId, files: Vec<BatchFile>) -> Result<(), NodeOdmError>;

    async fn commit_task(&self, job_id: &JobId) -> Result<(), NodeOdmError>;

    async fn task_info(&self, job_id: &JobId) -> Result<TaskInfo, NodeOdmError>;

    /// Write the `all.zip` bundle to `destination`, returning the bytes written.
    async fn download_assets(&self, job_id: &JobId, destination: &Path)
    -> Result<u64, NodeOdmError>;

    async fn remove_task(&self, job_id: &JobId) -> Result<(), NodeOdmError>;
}
