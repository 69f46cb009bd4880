//! Recording [`JobGateway`] double for component tests.

use std::collections::{HashSet, VecDeque};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::error::{NodeOdmError, Operation};
use super::gateway::JobGateway;
use super::types::{BatchFile, StatusField, TaskInfo};
use crate::task::{JobId, TaskOptions};

pub const JOB_ID: &str = "7f9c2b1e-55aa-4c1e-8d2f-000000000001";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Upload(Vec<String>),
    Commit,
    Info,
    Download,
    Remove,
}

pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    statuses: Mutex<VecDeque<u16>>,
    failing: HashSet<Operation>,
    failing_batch: Option<usize>,
    info_gate: Option<Arc<Semaphore>>,
    archive: Vec<u8>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            statuses: Mutex::new(VecDeque::new()),
            failing: HashSet::new(),
            failing_batch: None,
            info_gate: None,
            archive: sample_archive(),
        }
    }

    /// Status codes returned by successive `task_info` calls.
    pub fn with_statuses(self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.statuses.lock().unwrap().extend(codes);
        self
    }

    pub fn failing(mut self, operation: Operation) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Reject the `batch`-th upload call (1-based).
    pub fn failing_batch(mut self, batch: usize) -> Self {
        self.failing_batch = Some(batch);
        self
    }

    /// Every `task_info` call waits for a permit on `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.info_gate = Some(gate);
        self
    }

    pub fn with_archive(mut self, archive: Vec<u8>) -> Self {
        self.archive = archive;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    pub fn uploads(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Upload(names) => Some(names.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, operation: Operation) -> Result<(), NodeOdmError> {
        if self.failing.contains(&operation) {
            return Err(injected(operation));
        }
        Ok(())
    }
}

fn injected(operation: Operation) -> NodeOdmError {
    NodeOdmError::Remote {
        operation,
        status: 500,
        body: "injected failure".into(),
    }
}

#[async_trait]
impl JobGateway for FakeGateway {
    async fn create_task(&self, name: &str, _options: &TaskOptions) -> Result<JobId, NodeOdmError> {
        self.record(Call::Create(name.to_string()));
        self.check(Operation::Create)?;
        Ok(JobId::new(JOB_ID))
    }

    async fn upload_batch(&self, _job_id: &JobId, files: Vec<BatchFile>) -> Result<(), NodeOdmError> {
        self.record(Call::Upload(files.iter().map(|f| f.name.clone()).collect()));
        let batch = self.uploads().len();
        if self.failing_batch == Some(batch) {
            return Err(injected(Operation::Upload));
        }
        self.check(Operation::Upload)
    }

    async fn commit_task(&self, _job_id: &JobId) -> Result<(), NodeOdmError> {
        self.record(Call::Commit);
        self.check(Operation::Commit)
    }

    async fn task_info(&self, job_id: &JobId) -> Result<TaskInfo, NodeOdmError> {
        if let Some(gate) = &self.info_gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.record(Call::Info);
        self.check(Operation::Info)?;

        let code = self.statuses.lock().unwrap().pop_front();
        match code {
            Some(code) => Ok(TaskInfo {
                uuid: job_id.to_string(),
                name: None,
                status: StatusField {
                    code,
                    error_message: None,
                },
                images_count: None,
                progress: None,
                processing_time: None,
            }),
            None => Err(NodeOdmError::Decode {
                operation: Operation::Info,
                message: "no scripted status left".into(),
            }),
        }
    }

    async fn download_assets(
        &self,
        _job_id: &JobId,
        destination: &Path,
    ) -> Result<u64, NodeOdmError> {
        self.record(Call::Download);
        self.check(Operation::Download)?;
        tokio::fs::write(destination, &self.archive)
            .await
            .map_err(|source| NodeOdmError::Io {
                operation: Operation::Download,
                source,
            })?;
        Ok(self.archive.len() as u64)
    }

    async fn remove_task(&self, _job_id: &JobId) -> Result<(), NodeOdmError> {
        self.record(Call::Remove);
        self.check(Operation::Remove)
    }
}

/// A two-entry zip shaped like a NodeODM `all.zip`.
pub fn sample_archive() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer
        .start_file("odm_orthophoto/odm_orthophoto.tif", options)
        .unwrap();
    writer.write_all(b"II*\0orthophoto").unwrap();
    writer.start_file("log.json", options).unwrap();
    writer.write_all(b"{}").unwrap();
    writer.finish().unwrap().into_inner()
}
