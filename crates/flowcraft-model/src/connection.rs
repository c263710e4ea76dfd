use serde::{Deserialize, Serialize};

/// The default input name used when a connection doesn't specify one.
pub const DEFAULT_INPUT: &str = "main";

/// An edge from one node's named output to another node's named input.
///
/// A node may have multiple outgoing edges on the same output (fan-out) and multiple incoming edges
/// (join). Output names are node-type-specific (`"main"`, `"true"`/`"false"` for If,
/// `"output0"..`"outputN"` for Switch, `"loop"`/`"done"` for SplitInBatches).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
  pub source_node: String,
  pub source_output: String,
  pub target_node: String,
  #[serde(default = "default_input")]
  pub target_input: String,
}

fn default_input() -> String {
  DEFAULT_INPUT.to_string()
}

impl Connection {
  /// A stable key identifying this edge as a join-buffer slot on the target, used as
  /// `pendingInputs[target][edgeKey]` in.
  pub fn edge_key(&self) -> String {
    format!("{}:{}", self.source_node, self.source_output)
  }
}
