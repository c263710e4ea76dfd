use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flowcraft_model::{ExecutionError, ExecutionMode, NodeData};
use serde::{Deserialize, Serialize};

/// An execution's lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Running,
  Success,
  Failed,
  Cancelled,
}

/// One immutable-once-terminal entry in the recorder's bounded history ("Persisted state layout").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
  pub id: String,
  pub workflow_id: String,
  pub workflow_name: String,
  pub status: ExecutionStatus,
  pub mode: ExecutionMode,
  pub start_time: DateTime<Utc>,
  pub end_time: Option<DateTime<Utc>>,
  /// Last output items per node, mirrors `ExecutionContext::node_states` as of each `node:complete`
  /// event.
  pub node_data: HashMap<String, Vec<NodeData>>,
  pub errors: Vec<ExecutionError>,
}
