use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::status::TaskStatus;

/// Local lifecycle of a submitted task.
///
/// Each task flows through: INIT → UPLOADING → COMMITTED → POLLING, then
/// into one of COMPLETED, FAILED or CANCELED. Only COMPLETED continues on
/// to CLEANED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Init,
    Uploading,
    Committed,
    Polling,
    Completed,
    Failed,
    Canceled,
    Cleaned,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Init => write!(f, "INIT"),
            LifecycleState::Uploading => write!(f, "UPLOADING"),
            LifecycleState::Committed => write!(f, "COMMITTED"),
            LifecycleState::Polling => write!(f, "POLLING"),
            LifecycleState::Completed => write!(f, "COMPLETED"),
            LifecycleState::Failed => write!(f, "FAILED"),
            LifecycleState::Canceled => write!(f, "CANCELED"),
            LifecycleState::Cleaned => write!(f, "CLEANED"),
        }
    }
}

impl LifecycleState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Init, Uploading)
                | (Uploading, Committed)
                | (Committed, Polling)
                | (Polling, Completed)
                | (Polling, Failed)
                | (Polling, Canceled)
                | (Completed, Cleaned)
        )
    }

    /// The state a terminal remote status leads to, `None` for non-terminal ones.
    pub fn from_terminal(status: TaskStatus) -> Option<LifecycleState> {
        match status {
            TaskStatus::Completed => Some(LifecycleState::Completed),
            TaskStatus::Failed => Some(LifecycleState::Failed),
            TaskStatus::Canceled => Some(LifecycleState::Canceled),
            TaskStatus::Queued | TaskStatus::Running | TaskStatus::Unknown(_) => None,
        }
    }

    /// No transition leaves a final state.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            LifecycleState::Failed | LifecycleState::Canceled | LifecycleState::Cleaned
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("illegal lifecycle transition {from} -> {to}")]
    Illegal {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("status {observed} reported after terminal status {terminal}")]
    StatusAfterTerminal {
        terminal: TaskStatus,
        observed: TaskStatus,
    },
}
