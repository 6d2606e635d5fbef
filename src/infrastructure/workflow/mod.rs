//! Workflow infrastructure - the execution engine and its node executors

mod engine;
pub mod nodes;

pub use engine::{EngineSettings, WorkflowEngine, WorkflowEngineBuilder, collect_outputs};
pub use nodes::{NodeContext, NodeServices};
