use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{LifecycleState, TransitionError};
use super::status::TaskStatus;

/// Identifier the engine assigns to a task. Never generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single engine option, e.g. `fast-orthophoto = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOption {
    pub name: String,
    pub value: serde_json::Value,
}

impl TaskOption {
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The value as a plain form field: strings unquoted, everything else as JSON.
    pub fn value_string(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Ordered option set forwarded verbatim to the engine at creation time.
///
/// Serializes as `[{"name": ..., "value": ...}, ...]`, the shape NodeODM
/// expects in its `options` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskOptions(Vec<TaskOption>);

impl TaskOptions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Options that stop processing once the orthophoto exists.
    pub fn orthophoto_defaults() -> Self {
        Self::new()
            .with("end-with", "odm_orthophoto")
            .with("feature-quality", "high")
            .with("skip-3dmodel", true)
            .with("fast-orthophoto", true)
            .with("pc-quality", "high")
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.push(TaskOption::new(name, value));
        self
    }

    pub fn push(&mut self, option: TaskOption) {
        self.0.push(option);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskOption> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TaskOption> for TaskOptions {
    fn from_iter<I: IntoIterator<Item = TaskOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A task submitted for one transaction, tracked locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub transaction_id: String,
    pub work_dir: PathBuf,
    /// Last status observed on the engine, if any poll has happened.
    pub status: Option<TaskStatus>,
    pub state: LifecycleState,
    pub state_history: Vec<LifecycleState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, transaction_id: impl Into<String>, work_dir: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id,
            transaction_id: transaction_id.into(),
            work_dir,
            status: None,
            state: LifecycleState::Init,
            state_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, recording the current state in the history.
    pub fn advance(&mut self, next: LifecycleState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError::Illegal {
                from: self.state,
                to: next,
            });
        }
        self.state_history.push(self.state);
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a status reported by the engine. Refused once a terminal
    /// status has been seen.
    pub fn observe(&mut self, status: TaskStatus) -> Result<(), TransitionError> {
        if let Some(terminal) = self.status.filter(|s| s.is_terminal()) {
            return Err(TransitionError::StatusAfterTerminal {
                terminal,
                observed: status,
            });
        }
        self.status = Some(status);
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Summary logged when a task's background phase ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub job_id: JobId,
    pub transaction_id: String,
    pub final_state: LifecycleState,
    pub state_transitions: Vec<LifecycleState>,
    pub last_status: Option<TaskStatus>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl LifecycleRecord {
    pub fn from_job(job: &Job) -> Self {
        let now = Utc::now();
        let mut transitions = job.state_history.clone();
        transitions.push(job.state);

        Self {
            job_id: job.id.clone(),
            transaction_id: job.transaction_id.clone(),
            final_state: job.state,
            state_transitions: transitions,
            last_status: job.status,
            started_at: job.created_at,
            finished_at: now,
            duration_ms: (now - job.created_at).num_milliseconds(),
        }
    }
}
