//! Submits photo sets to a NodeODM engine and drives each task from
//! creation to a collected orthophoto.
//!
//! [`Orchestrator::calculate_orthophoto`] is the entry point: it uploads a
//! transaction's images, commits the task and hands back the engine's task
//! id, leaving polling, result collection and cleanup to a detached task.

pub mod collector;
pub mod config;
pub mod error;
pub mod nodeodm;
pub mod orchestrator;
pub mod poller;
pub mod task;
pub mod upload;

pub use config::OdmConfig;
pub use error::{FaultKind, SubmitError};
pub use nodeodm::{JobGateway, NodeOdmClient};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use task::{JobId, TaskOption, TaskOptions, TaskStatus};
