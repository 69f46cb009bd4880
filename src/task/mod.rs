mod job;
mod state;
mod status;

pub use job::{Job, JobId, LifecycleRecord, TaskOption, TaskOptions};
pub use state::{LifecycleState, TransitionError};
pub use status::TaskStatus;
