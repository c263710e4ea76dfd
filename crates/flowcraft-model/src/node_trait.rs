use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::context::ExecutionContext;
use crate::data::{NodeData, Payload};

/// Outputs a node body hands back to the kernel: one [`Payload`] per declared output name (Node
/// API).
pub type NodeOutputs = HashMap<String, Payload>;

/// Errors a node body can raise. The kernel decides retry / continue-on-fail disposition based on
/// this, not the node.
#[derive(Debug, Error)]
pub enum NodeError {
  /// Generic execution failure.
  #[error("{0}")]
  Execution(String),
  /// HttpRequest-style transport failure (`TransportError`).
  #[error("transport error: {0}")]
  Transport(String),
  /// Wait / Code sandbox deadline exceeded (`TimeoutError`).
  #[error("timed out after {0}ms")]
  Timeout(u64),
  /// The node was asked to run with input it cannot handle (e.g. Start with zero items).
  #[error("invalid input: {0}")]
  InvalidInput(String),
}

/// Re-resolves a node's raw (templated) parameters against a specific input item: `$json` and
/// `$itemIndex` are per-item, not fixed at kernel time. Implemented by the kernel crate,
/// which owns the expression engine dependency; `flowcraft-model` only sees the trait so there is
/// no dependency cycle.
///
/// Nodes whose semantics are per-item (If, Switch, Set) call [`NodeContext::resolve_params`] once
/// per item instead of relying on the kernel's single top-level resolution pass, which is bound to
/// item 0 and exists for nodes that only need one shared set of resolved parameters (HttpRequest,
/// Code, SplitInBatches).
pub trait ParamResolver: Send + Sync {
  fn resolve(
    &self,
    template: &Value,
    input_items: &[NodeData],
    item_index: usize,
    ctx: &NodeContext<'_>,
  ) -> (Value, Vec<String>);
}

/// The read/write surface a node body is given into the live [`ExecutionContext`] (: "Access to
/// `context.nodeStates`, `context.nodeInternalState[self.name]`, `context.executionId`").
///
/// Deliberately narrower than `&mut ExecutionContext` — a node can read any node's last output and
/// the execution id, and can only read/write its own private state slot.
pub struct NodeContext<'a> {
  ctx: &'a mut ExecutionContext,
  node_name: &'a str,
  pub run_index: u32,
  pub cancel: CancellationToken,
  raw_params: &'a Value,
  resolver: &'a dyn ParamResolver,
}

impl<'a> NodeContext<'a> {
  pub fn new(
    ctx: &'a mut ExecutionContext,
    node_name: &'a str,
    run_index: u32,
    cancel: CancellationToken,
    raw_params: &'a Value,
    resolver: &'a dyn ParamResolver,
  ) -> Self {
    Self {
      ctx,
      node_name,
      run_index,
      cancel,
      raw_params,
      resolver,
    }
  }

  /// Re-resolve this node's raw parameter tree against `input_items[item_index]`.
  pub fn resolve_params(&self, input_items: &[NodeData], item_index: usize) -> (Value, Vec<String>) {
    self.resolver.resolve(self.raw_params, input_items, item_index, self)
  }

  pub fn execution_id(&self) -> &str {
    &self.ctx.execution_id
  }

  pub fn mode(&self) -> crate::context::ExecutionMode {
    self.ctx.mode
  }

  pub fn start_time(&self) -> chrono::DateTime<chrono::Utc> {
    self.ctx.start_time
  }

  /// Last output items of any previously-executed node.
  pub fn node_output(&self, name: &str) -> Option<&[NodeData]> {
    self.ctx.node_states.get(name).map(|v| v.as_slice())
  }

  /// All node outputs produced so far, keyed by node name.
  pub fn all_node_outputs(&self) -> &HashMap<String, Vec<NodeData>> {
    &self.ctx.node_states
  }

  /// This node's own private state slot (e.g. SplitInBatches cursor).
  pub fn internal_state(&self) -> Option<&Value> {
    self.ctx.node_internal_state.get(self.node_name)
  }

  pub fn set_internal_state(&mut self, value: Value) {
    self.ctx.node_internal_state.insert(self.node_name.to_string(), value);
  }

  /// The host process environment, for the expression engine's `$env` context (spec.md §4.3).
  ///
  /// Not for node bodies to hand to untrusted script execution: the Code node's sandbox must stay
  /// isolated from the host per spec.md §4.7/§5, so [`crate::Node`] implementations that run
  /// user-supplied code must not read this and pass it through.
  pub fn env(&self) -> HashMap<String, String> {
    std::env::vars().collect()
  }

  /// Registers a resumption hook for a `Wait`-for-webhook node under `handle_id` and returns the
  /// receiving end. The kernel suspends this node-run until either the returned receiver resolves
  /// (some external caller invoked `ExecutionContext`'s matching `WaitHandle::resume`) or
  /// `self.cancel` fires (`waitingNodes`).
  pub fn register_wait(&mut self, handle_id: String) -> tokio::sync::oneshot::Receiver<Value> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    self
      .ctx
      .waiting_nodes
      .insert(handle_id, crate::context::WaitHandle::new(self.node_name.to_string(), tx));
    rx
  }
}

/// The contract every built-in or user node type implements (Node API). Invoked by the kernel after
/// parameter resolution.
#[async_trait]
pub trait Node: Send + Sync {
  async fn execute(
    &self,
    ctx: &mut NodeContext<'_>,
    params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError>;
}
