use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flowcraft_model::{ExecutionMode, NodeData};

/// Everything an expression may read ("Context accessors").
///
/// Built fresh by the kernel for each node-run / item pair; never mutated during evaluation.
pub struct EvalContext<'a> {
  pub input_items: &'a [NodeData],
  pub item_index: usize,
  pub node_states: &'a HashMap<String, Vec<NodeData>>,
  pub env: &'a HashMap<String, String>,
  pub execution_id: &'a str,
  pub mode: ExecutionMode,
  pub start_time: DateTime<Utc>,
  pub run_index: u32,
}

impl<'a> EvalContext<'a> {
  pub fn current_json(&self) -> Option<&serde_json::Value> {
    self.input_items.get(self.item_index).map(|d| &d.json)
  }
}
