//! Core data model shared by every flowcraft crate.
//!
//! Types here are plain data: a [`Workflow`] definition, the [`NodeData`]
//! item shape that flows between nodes, and the [`ExecutionContext`] that
//! lives for one run. Behavior (validation, scheduling, execution) lives in
//! the crates built on top of this one.

mod connection;
mod context;
mod data;
mod node;
mod node_trait;
mod workflow;

pub use connection::{Connection, DEFAULT_INPUT};
pub use context::{ExecutionContext, ExecutionError, ExecutionMode, WaitHandle};
pub use data::{NodeData, Payload};
pub use node::{ErrorPolicy, NodeDefinition};
pub use node_trait::{Node, NodeContext, NodeError, NodeOutputs, ParamResolver};
pub use workflow::Workflow;
