//! Batched image upload into a freshly created task.
//!
//! Opening every image of a large flight at once exhausts file handles, so
//! the directory is sent in fixed-size batches, one request at a time. A
//! rejected batch stops the upload; batches already accepted stay on the
//! engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::nodeodm::{BatchFile, JobGateway, NodeOdmError};
use crate::task::JobId;

pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to list images in {}: {source}", .path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("batch {batch}: failed to open {}: {source}", .path.display())]
    Open {
        batch: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("batch {batch} of {total} was rejected: {source}")]
    Batch {
        batch: usize,
        total: usize,
        #[source]
        source: NodeOdmError,
    },
}

impl UploadError {
    /// 1-based index of the failing batch, if the failure belongs to one.
    pub fn batch(&self) -> Option<usize> {
        match self {
            UploadError::Enumerate { .. } => None,
            UploadError::Open { batch, .. } | UploadError::Batch { batch, .. } => Some(*batch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub files: usize,
    pub batches: usize,
}

/// Regular files directly inside `dir`, sorted by path. Symlinks are
/// followed; entries that no longer resolve are skipped.
pub async fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => {}
            // Dangling symlink, or removed since the listing.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "skipping entry that no longer resolves");
            }
            Err(e) => return Err(e),
        }
    }
    files.sort();
    Ok(files)
}

pub fn batch_count(files: usize, batch_size: usize) -> usize {
    files.div_ceil(batch_size.max(1))
}

pub struct BatchUploader {
    gateway: Arc<dyn JobGateway>,
    batch_size: usize,
}

impl BatchUploader {
    /// A `batch_size` of zero is treated as one.
    pub fn new(gateway: Arc<dyn JobGateway>, batch_size: usize) -> Self {
        Self {
            gateway,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Upload every image in `dir` to `job_id`, batch by batch.
    ///
    /// Returns only after the engine acknowledged every batch. The first
    /// failure aborts the remaining batches.
    pub async fn upload(&self, job_id: &JobId, dir: &Path) -> Result<UploadSummary, UploadError> {
        let files = list_images(dir).await.map_err(|source| UploadError::Enumerate {
            path: dir.to_path_buf(),
            source,
        })?;
        let total = batch_count(files.len(), self.batch_size);

        if files.is_empty() {
            warn!(job_id = %job_id, dir = %dir.display(), "no images to upload");
        }

        for (index, chunk) in files.chunks(self.batch_size).enumerate() {
            let batch = index + 1;
            let opened = open_batch(batch, chunk).await?;
            debug!(job_id = %job_id, batch, total, files = opened.len(), "sending batch");

            self.gateway
                .upload_batch(job_id, opened)
                .await
                .map_err(|source| UploadError::Batch {
                    batch,
                    total,
                    source,
                })?;
            info!(job_id = %job_id, batch, total, files = chunk.len(), "batch uploaded");
        }

        info!(job_id = %job_id, files = files.len(), batches = total, "all images uploaded");
        Ok(UploadSummary {
            files: files.len(),
            batches: total,
        })
    }
}

/// Open every file of one batch. Handles opened before a failure are
/// closed when the partial vector is dropped.
async fn open_batch(batch: usize, paths: &[PathBuf]) -> Result<Vec<BatchFile>, UploadError> {
    let mut opened = Vec::with_capacity(paths.len());
    for path in paths {
        let file = BatchFile::open(path)
            .await
            .map_err(|source| UploadError::Open {
                batch,
                path: path.clone(),
                source,
            })?;
        opened.push(file);
    }
    Ok(opened)
}
