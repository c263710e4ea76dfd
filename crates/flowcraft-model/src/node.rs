use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::NodeData;

/// Per-node retry / continue-on-fail policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPolicy {
  /// Convert an exhausted-retry failure into a synthetic error item instead
  /// of failing the node.
  #[serde(default)]
  pub continue_on_fail: bool,
  /// Number of retries after the first attempt (0..=10). `0` means one
  /// attempt total.
  #[serde(default)]
  pub retry_on_fail: u8,
  /// Delay between retry attempts, in milliseconds.
  #[serde(default)]
  pub retry_delay_ms: u64,
}

impl Default for ErrorPolicy {
  fn default() -> Self {
    Self {
      continue_on_fail: false,
      retry_on_fail: 0,
      retry_delay_ms: 0,
    }
  }
}

impl ErrorPolicy {
  /// Total attempts the kernel should make (first attempt + retries).
  pub fn max_attempts(&self) -> u32 {
    1 + u32::from(self.retry_on_fail.min(10))
  }
}

/// A node definition within a [`crate::Workflow`].
///
/// `name` is the node's unique key within the workflow and the key used to
/// look it up from expressions (`$node["Name"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
  /// Unique name within the workflow.
  pub name: String,
  /// Registered node type, e.g. "If", "HttpRequest", "Code".
  #[serde(rename = "type")]
  pub node_type: String,
  /// Parameter bag; values may contain `{{ }}` expression templates.
  #[serde(default)]
  pub parameters: Map<String, Value>,
  /// When true, the kernel forwards input unchanged on `main` without
  /// invoking the node body.
  #[serde(default)]
  pub disabled: bool,
  /// Retry / continue-on-fail policy.
  #[serde(default)]
  pub error_policy: ErrorPolicy,
  /// Test-only substitute output; when set, the kernel emits these items on
  /// `main` without executing the node body.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pinned_data: Option<Vec<NodeData>>,
}

impl NodeDefinition {
  /// Look up a parameter by key.
  pub fn parameter(&self, key: &str) -> Option<&Value> {
    self.parameters.get(key)
  }
}
