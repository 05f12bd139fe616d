//! Core abstractions for the rill workflow engine
//!
//! This crate provides the domain types and contracts that all other
//! components depend on: workflow graph records, run and log state,
//! the executor capability, and the repository interfaces the engine
//! talks to. It performs no I/O of its own.

mod error;
mod executor;
mod repository;
mod run;
mod workflow;

pub use error::{EngineError, NodeError, StoreError};
pub use executor::{ExecutionContext, NodeExecutor, NodeResult, ResultStatus};
pub use repository::{
    EdgeRepository, LogRepository, LogUpdate, NodeRepository, RunRepository,
};
pub use run::{LogStatus, NodeRunLog, RunStatus, WorkflowRun};
pub use workflow::{NodeData, WorkflowEdge, WorkflowNode};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
