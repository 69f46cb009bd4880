use std::path::PathBuf;

use thiserror::Error;

use crate::nodeodm::NodeOdmError;
use crate::task::{JobId, TransitionError};
use crate::upload::UploadError;

/// Faults surfaced to whoever asked for an orthophoto.
///
/// Everything after the commit is reported through logs only; the caller
/// holds a job id by then.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("transaction id {0:?} does not name an image directory")]
    InvalidTransaction(String),

    #[error("image directory {} does not exist", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("task creation failed: {0}")]
    Create(#[source] NodeOdmError),

    #[error("upload to task {job_id} failed: {source}")]
    Upload {
        job_id: JobId,
        #[source]
        source: UploadError,
    },

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] TransitionError),
}

impl SubmitError {
    pub fn kind(&self) -> FaultKind {
        match self {
            SubmitError::InvalidTransaction(_) | SubmitError::DirectoryNotFound(_) => {
                FaultKind::NotFound
            }
            SubmitError::Create(_) | SubmitError::Upload { .. } | SubmitError::Lifecycle(_) => {
                FaultKind::Internal
            }
        }
    }
}

/// Coarse outcome class for a rejected submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// No images exist for the transaction. Retrying will not help.
    NotFound,
    /// The engine could not take the task.
    Internal,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::NotFound => write!(f, "NotFound"),
            FaultKind::Internal => write!(f, "Internal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("engine_url must not be empty")]
    MissingEngineUrl,

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("poll_interval_secs must be at least 1")]
    ZeroPollInterval,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodeodm::Operation;

    #[test]
    fn precondition_faults_are_not_found() {
        assert_eq!(
            SubmitError::DirectoryNotFound(PathBuf::from("/img/tx")).kind(),
            FaultKind::NotFound
        );
        assert_eq!(
            SubmitError::InvalidTransaction("../etc".into()).kind(),
            FaultKind::NotFound
        );
    }

    #[test]
    fn create_fault_is_internal() {
        let err = SubmitError::Create(NodeOdmError::Remote {
            operation: Operation::Create,
            status: 503,
            body: "busy".into(),
        });
        assert_eq!(err.kind(), FaultKind::Internal);
        assert_eq!(
            err.to_string(),
            "task creation failed: create returned status 503: busy"
        );
    }

    #[test]
    fn directory_display() {
        let err = SubmitError::DirectoryNotFound(PathBuf::from("/img/tx-9"));
        assert_eq!(err.to_string(), "image directory /img/tx-9 does not exist");
    }
}
