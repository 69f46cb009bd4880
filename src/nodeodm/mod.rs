pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod gateway;
pub mod types;

pub use client::NodeOdmClient;
pub use error::{NodeOdmError, Operation};
pub use gateway::JobGateway;
pub use types::{BatchFile, OptionsEncoding, StatusField, TaskInfo};
