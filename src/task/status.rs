use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote task status as reported by the engine's `status.code` field.
///
/// Codes outside the documented set map to [`TaskStatus::Unknown`] so that
/// a newer engine never silently turns into a known state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Queued,
    Running,
    Failed,
    Completed,
    Canceled,
    Unknown(u16),
}

impl TaskStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            10 => TaskStatus::Queued,
            20 => TaskStatus::Running,
            30 => TaskStatus::Failed,
            40 => TaskStatus::Completed,
            50 => TaskStatus::Canceled,
            other => TaskStatus::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            TaskStatus::Queued => 10,
            TaskStatus::Running => 20,
            TaskStatus::Failed => 30,
            TaskStatus::Completed => 40,
            TaskStatus::Canceled => 50,
            TaskStatus::Unknown(code) => code,
        }
    }

    /// Terminal statuses never change again on the engine side.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Failed | TaskStatus::Completed | TaskStatus::Canceled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Canceled => write!(f, "canceled"),
            TaskStatus::Unknown(code) => write!(f, "unknown (code {code})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_codes_map_to_variants() {
        assert_eq!(TaskStatus::from_code(10), TaskStatus::Queued);
        assert_eq!(TaskStatus::from_code(20), TaskStatus::Running);
        assert_eq!(TaskStatus::from_code(30), TaskStatus::Failed);
        assert_eq!(TaskStatus::from_code(40), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_code(50), TaskStatus::Canceled);
    }

    #[test]
    fn unknown_code_is_preserved() {
        let status = TaskStatus::from_code(99);
        assert_eq!(status, TaskStatus::Unknown(99));
        assert_eq!(status.code(), 99);
        assert!(!status.is_terminal());
    }

    #[test]
    fn code_inverts_from_code() {
        for code in [10, 20, 30, 40, 50, 0, 7] {
            assert_eq!(TaskStatus::from_code(code).code(), code);
        }
    }

    #[test]
    fn only_failed_completed_and_canceled_are_terminal() {
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Canceled.is_terminal());
    }

    #[test]
    fn status_display() {
        assert_eq!(TaskStatus::Running.to_string(), "running");
        assert_eq!(TaskStatus::Unknown(60).to_string(), "unknown (code 60)");
    }
}
