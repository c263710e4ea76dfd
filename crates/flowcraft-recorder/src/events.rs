//! Execution events and notifiers for observability.
//!
//! Events are emitted around each node execution so consumers can observe progress, persist state,
//! or stream to a UI: a plain enum plus a one-method trait, not a framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::ExecutionStatus;

/// Events emitted during workflow execution: `NodeStart`, `NodeComplete`, `NodeError`, and a single
/// `ExecutionComplete {status}` rather than separate completed/failed shapes, since
/// `ExecutionStatus` already distinguishes success/failure/cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  NodeStart {
    execution_id: String,
    node_name: String,
    node_type: String,
    timestamp: DateTime<Utc>,
  },
  NodeComplete {
    execution_id: String,
    node_name: String,
    data: Value,
    duration_ms: u64,
    timestamp: DateTime<Utc>,
  },
  NodeError {
    execution_id: String,
    node_name: String,
    error: String,
    timestamp: DateTime<Utc>,
  },
  ExecutionComplete {
    execution_id: String,
    status: ExecutionStatus,
    timestamp: DateTime<Utc>,
  },
}

impl ExecutionEvent {
  pub fn execution_id(&self) -> &str {
    match self {
      Self::NodeStart { execution_id, .. }
      | Self::NodeComplete { execution_id, .. }
      | Self::NodeError { execution_id, .. }
      | Self::ExecutionComplete { execution_id, .. } => execution_id,
    }
  }
}

/// Receives execution events. Implementations decide what to do with them (persist, broadcast, log,
/// ignore).
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards every event. Useful for tests or when observation isn't needed.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events onto a broadcast channel, so multiple independent subscribers (e.g. several SSE
/// clients watching the same execution) can each get their own receiver — unlike the
/// single-consumer `mpsc` this is grounded on, broadcast is the ambient choice here (see
/// DESIGN.md).
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: tokio::sync::broadcast::Sender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: tokio::sync::broadcast::Sender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Ignore send errors - no subscribers currently listening.
    let _ = self.sender.send(event);
  }
}
