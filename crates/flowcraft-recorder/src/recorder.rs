use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use flowcraft_model::{ExecutionError, ExecutionMode, NodeData};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::instrument;

use crate::error::RecorderError;
use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::record::{ExecutionRecord, ExecutionStatus};

const DEFAULT_CAPACITY: usize = 100;
const EVENT_CHANNEL_CAPACITY: usize = 1024;

struct State {
  records: HashMap<String, ExecutionRecord>,
  /// Insertion order, oldest first; used for FIFO eviction and for `list`.
  order: VecDeque<String>,
}

/// Bounded in-memory execution history plus a live event stream (resource limits). Running records
/// are never evicted: `enforce_capacity` walks the insertion order looking for the oldest
/// non-`Running` record.
pub struct Recorder {
  state: Mutex<State>,
  capacity: usize,
  sender: broadcast::Sender<ExecutionEvent>,
}

impl Recorder {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    Self {
      state: Mutex::new(State { records: HashMap::new(), order: VecDeque::new() }),
      capacity,
      sender,
    }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
    self.sender.subscribe()
  }

  #[instrument(skip(self), fields(execution_id = %execution_id))]
  pub fn start(&self, execution_id: &str, workflow_id: &str, workflow_name: &str, mode: ExecutionMode) {
    let record = ExecutionRecord {
      id: execution_id.to_string(),
      workflow_id: workflow_id.to_string(),
      workflow_name: workflow_name.to_string(),
      status: ExecutionStatus::Running,
      mode,
      start_time: Utc::now(),
      end_time: None,
      node_data: HashMap::new(),
      errors: Vec::new(),
    };
    let mut state = self.state.lock();
    state.order.push_back(execution_id.to_string());
    state.records.insert(execution_id.to_string(), record);
    enforce_capacity(&mut state, self.capacity);
  }

  pub fn complete(&self, execution_id: &str) -> Result<(), RecorderError> {
    self.finish(execution_id, ExecutionStatus::Success)
  }

  pub fn fail(&self, execution_id: &str) -> Result<(), RecorderError> {
    self.finish(execution_id, ExecutionStatus::Failed)
  }

  pub fn cancel(&self, execution_id: &str) -> Result<(), RecorderError> {
    self.finish(execution_id, ExecutionStatus::Cancelled)
  }

  fn finish(&self, execution_id: &str, status: ExecutionStatus) -> Result<(), RecorderError> {
    {
      let mut state = self.state.lock();
      let record = state
        .records
        .get_mut(execution_id)
        .ok_or_else(|| RecorderError::NotFound(execution_id.to_string()))?;
      record.status = status;
      record.end_time = Some(Utc::now());
    }
    self.notify(ExecutionEvent::ExecutionComplete {
      execution_id: execution_id.to_string(),
      status,
      timestamp: Utc::now(),
    });
    Ok(())
  }

  pub fn get(&self, execution_id: &str) -> Option<ExecutionRecord> {
    self.state.lock().records.get(execution_id).cloned()
  }

  pub fn list(&self) -> Vec<ExecutionRecord> {
    let state = self.state.lock();
    state.order.iter().filter_map(|id| state.records.get(id).cloned()).collect()
  }

  pub fn delete(&self, execution_id: &str) -> Result<(), RecorderError> {
    let mut state = self.state.lock();
    if state.records.remove(execution_id).is_none() {
      return Err(RecorderError::NotFound(execution_id.to_string()));
    }
    state.order.retain(|id| id != execution_id);
    Ok(())
  }

  pub fn clear(&self) {
    let mut state = self.state.lock();
    state.records.clear();
    state.order.clear();
  }

  pub fn node_started(&self, execution_id: &str, node_name: &str, node_type: &str) {
    self.notify(ExecutionEvent::NodeStart {
      execution_id: execution_id.to_string(),
      node_name: node_name.to_string(),
      node_type: node_type.to_string(),
      timestamp: Utc::now(),
    });
  }

  pub fn node_completed(&self, execution_id: &str, node_name: &str, items: &[NodeData], duration_ms: u64) {
    let data = serde_json::to_value(items).unwrap_or(Value::Null);
    self.notify(ExecutionEvent::NodeComplete {
      execution_id: execution_id.to_string(),
      node_name: node_name.to_string(),
      data,
      duration_ms,
      timestamp: Utc::now(),
    });
  }

  pub fn node_failed(&self, execution_id: &str, node_name: &str, error: &str) {
    self.notify(ExecutionEvent::NodeError {
      execution_id: execution_id.to_string(),
      node_name: node_name.to_string(),
      error: error.to_string(),
      timestamp: Utc::now(),
    });
  }
}

impl ExecutionNotifier for Recorder {
  fn notify(&self, event: ExecutionEvent) {
    match &event {
      ExecutionEvent::NodeComplete { execution_id, node_name, data, .. } => {
        if let Ok(items) = serde_json::from_value::<Vec<NodeData>>(data.clone()) {
          let mut state = self.state.lock();
          if let Some(record) = state.records.get_mut(execution_id) {
            record.node_data.insert(node_name.clone(), items);
          }
        }
      }
      ExecutionEvent::NodeError { execution_id, node_name, error, timestamp } => {
        let mut state = self.state.lock();
        if let Some(record) = state.records.get_mut(execution_id) {
          record.errors.push(ExecutionError {
            node_name: node_name.clone(),
            message: error.clone(),
            timestamp: *timestamp,
          });
        }
      }
      ExecutionEvent::NodeStart { .. } | ExecutionEvent::ExecutionComplete { .. } => {}
    }
    // Ignore send errors - no subscribers currently listening.
    let _ = self.sender.send(event);
  }
}

impl Default for Recorder {
  fn default() -> Self {
    Self::new(DEFAULT_CAPACITY)
  }
}

fn enforce_capacity(state: &mut State, capacity: usize) {
  while state.order.len() > capacity {
    let evictable = state
      .order
      .iter()
      .position(|id| state.records.get(id).map(|r| r.status != ExecutionStatus::Running).unwrap_or(true));
    match evictable {
      Some(pos) => {
        if let Some(id) = state.order.remove(pos) {
          state.records.remove(&id);
        }
      }
      None => break,
    }
  }
}
