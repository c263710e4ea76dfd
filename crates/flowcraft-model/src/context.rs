use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::data::{NodeData, Payload};
use crate::workflow::Workflow;

/// How an execution was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
  Manual,
  Webhook,
  Cron,
}

/// One entry in `context.errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionError {
  pub node_name: String,
  pub message: String,
  pub timestamp: DateTime<Utc>,
}

/// A pending resumption hook for a `Wait` node waiting on a named webhook rather than a fixed
/// duration (`waitingNodes`).
pub struct WaitHandle {
  pub node_name: String,
  resume: Option<oneshot::Sender<serde_json::Value>>,
}

impl WaitHandle {
  pub fn new(node_name: String, resume: oneshot::Sender<serde_json::Value>) -> Self {
    Self {
      node_name,
      resume: Some(resume),
    }
  }

  /// Resume the waiting node with the given payload. A no-op if already resumed.
  pub fn resume(&mut self, payload: serde_json::Value) {
    if let Some(tx) = self.resume.take() {
      let _ = tx.send(payload);
    }
  }
}

/// The lifetime-of-one-run execution state.
///
/// Mutated only by the scheduler and the kernel; never shared across executions
/// ("Cross-execution").
pub struct ExecutionContext {
  pub workflow: Workflow,
  pub execution_id: String,
  pub start_time: DateTime<Utc>,
  pub mode: ExecutionMode,

  /// Last produced output items per node (invariant 2: written at most once per node-run,
  /// overwritten on loop re-entry).
  pub node_states: HashMap<String, Vec<NodeData>>,
  /// Number of times each node has executed so far.
  pub node_run_counts: HashMap<String, u32>,
  /// Join buffers: target node -> edge key -> payload received so far.
  pub pending_inputs: HashMap<String, HashMap<String, Payload>>,
  /// Opaque per-node private state (e.g. SplitInBatches cursor).
  pub node_internal_state: HashMap<String, serde_json::Value>,
  pub errors: Vec<ExecutionError>,
  /// Non-fatal expression/warning entries (edge policy).
  pub warnings: Vec<ExecutionError>,
  /// Outstanding Wait-for-webhook resumption hooks, keyed by handle id.
  pub waiting_nodes: HashMap<String, WaitHandle>,
}

impl ExecutionContext {
  pub fn new(workflow: Workflow, execution_id: String, mode: ExecutionMode) -> Self {
    Self {
      workflow,
      execution_id,
      start_time: Utc::now(),
      mode,
      node_states: HashMap::new(),
      node_run_counts: HashMap::new(),
      pending_inputs: HashMap::new(),
      node_internal_state: HashMap::new(),
      errors: Vec::new(),
      warnings: Vec::new(),
      waiting_nodes: HashMap::new(),
    }
  }

  /// Invariant 5: execution status is `failed` iff `errors` is non-empty.
  pub fn succeeded(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn run_index(&self, node_name: &str) -> u32 {
    self.node_run_counts.get(node_name).copied().unwrap_or(0)
  }
}
