//! Download and unpack a completed task's `all.zip` into its working directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::nodeodm::{JobGateway, NodeOdmError};
use crate::task::JobId;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("download failed: {0}")]
    Download(#[from] NodeOdmError),

    #[error("cannot read archive {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive could not be extracted: {0}")]
    Extract(#[from] zip::result::ZipError),

    #[error("extraction task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectSummary {
    pub archive_bytes: u64,
    pub entries: usize,
}

pub struct ResultCollector {
    gateway: Arc<dyn JobGateway>,
}

impl ResultCollector {
    pub fn new(gateway: Arc<dyn JobGateway>) -> Self {
        Self { gateway }
    }

    /// Fetch the result bundle of `job_id` and extract it into `destination`.
    ///
    /// The archive lands in a transient file inside `destination` first and
    /// is removed afterwards whatever the outcome; a failed removal is only
    /// logged.
    pub async fn collect(
        &self,
        job_id: &JobId,
        destination: &Path,
    ) -> Result<CollectSummary, CollectError> {
        let transient = destination.join(format!(".all-{}.zip", Uuid::new_v4().simple()));
        let outcome = self.fetch_and_extract(job_id, destination, &transient).await;
        discard_transient(&transient).await;

        let summary = outcome?;
        info!(
            job_id = %job_id,
            bytes = summary.archive_bytes,
            entries = summary.entries,
            dest = %destination.display(),
            "results extracted"
        );
        Ok(summary)
    }

    async fn fetch_and_extract(
        &self,
        job_id: &JobId,
        destination: &Path,
        transient: &Path,
    ) -> Result<CollectSummary, CollectError> {
        let archive_bytes = self.gateway.download_assets(job_id, transient).await?;
        info!(job_id = %job_id, bytes = archive_bytes, "results downloaded");

        let archive = transient.to_path_buf();
        let into = destination.to_path_buf();
        let entries = tokio::task::spawn_blocking(move || extract_archive(&archive, &into)).await??;

        Ok(CollectSummary {
            archive_bytes,
            entries,
        })
    }
}

/// Unpack `archive` into `into`. Entries whose paths escape `into` are
/// rejected by the zip crate.
fn extract_archive(archive: &Path, into: &Path) -> Result<usize, CollectError> {
    let file = std::fs::File::open(archive).map_err(|source| CollectError::Io {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file)?;
    let entries = zip.len();
    zip.extract(into)?;
    Ok(entries)
}

async fn discard_transient(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove transient archive"),
    }
}
